//! Forward real-to-half-complex transform.
//!
//! The output uses the half-complex layout: real parts of bins `0..=N/2`
//! followed by the imaginary parts of bins `(N-1)/2 ..= 1` in reverse order.
//! The first half of the output is therefore the real part of each bin,
//! which the waterfall uses directly as a magnitude proxy.

use crate::error::{Result, WfallError};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// A planned forward transform of fixed length with its working buffers.
///
/// Created once per engine and released when the engine exits.
pub struct TransformPlan {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    output: Vec<f32>,
}

impl TransformPlan {
    /// Plans a transform of `size` points.
    ///
    /// # Errors
    /// Returns `WfallError::Transform` if `size` is not a positive even number.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || size % 2 != 0 {
            return Err(WfallError::Transform(format!(
                "transform size must be a positive even number, got {size}"
            )));
        }

        let fft = FftPlanner::new().plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        tracing::debug!("Transform plan created: {} points", size);
        Ok(Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            output: vec![0.0; size],
        })
    }

    /// Number of points the plan was built for.
    pub fn len(&self) -> usize {
        self.output.len()
    }

    /// Transforms `input` and returns the half-complex output.
    ///
    /// `input` must be exactly `len()` samples long.
    pub fn execute(&mut self, input: &[f32]) -> &[f32] {
        debug_assert_eq!(input.len(), self.len());

        for (slot, &sample) in self.buffer.iter_mut().zip(input) {
            *slot = Complex::new(sample, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let n = self.output.len();
        for k in 0..=n / 2 {
            self.output[k] = self.buffer[k].re;
        }
        for k in 1..(n + 1) / 2 {
            self.output[n - k] = self.buffer[k].im;
        }
        &self.output
    }
}

impl Drop for TransformPlan {
    fn drop(&mut self) {
        tracing::debug!("Transform plan released: {} points", self.output.len());
    }
}
