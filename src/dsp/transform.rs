//! Sliding-window transform engine.
//!
//! Keeps the most recent `N` samples and advances the window in `split`
//! steps per incoming frame, emitting one spectral row per step.

use super::plan::TransformPlan;
use crate::error::{Result, WfallError};

/// Stateful sliding-window analyzer with an owned transform plan.
pub struct SlidingTransform {
    plan: TransformPlan,
    /// Oldest sample first
    window: Vec<f32>,
    split: usize,
    decay: f32,
}

impl SlidingTransform {
    /// Creates an engine over a zeroed window of `size` samples.
    ///
    /// # Errors
    /// - If `split` is zero
    /// - If the transform cannot be planned for `size`
    pub fn new(size: usize, split: usize, decay: f32) -> Result<Self> {
        if split == 0 {
            return Err(WfallError::InvalidConfig(
                "transform split must be at least 1".into(),
            ));
        }
        Ok(Self {
            plan: TransformPlan::new(size)?,
            window: vec![0.0; size],
            split,
            decay,
        })
    }

    /// Returns the current window contents, oldest sample first.
    #[cfg(test)]
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Length of each emitted spectral row.
    pub fn row_len(&self) -> usize {
        self.window.len() / 2
    }

    /// Incorporates one frame and returns exactly `split` spectral rows.
    ///
    /// The frame is cut into `split` chunks of `len / split` samples; any
    /// remainder at the end of the frame is ignored.
    pub fn ingest(&mut self, frame: &[f32]) -> Vec<Vec<f32>> {
        let w = frame.len() / self.split;
        let half = self.row_len();
        let mut rows = Vec::with_capacity(self.split);

        for chunk in (0..self.split).map(|i| &frame[w * i..w * (i + 1)]) {
            self.advance(chunk);
            let spectrum = self.plan.execute(&self.window);
            rows.push(spectrum[..half].to_vec());
        }
        rows
    }

    /// Shifts the window left by `chunk.len()` and appends `chunk`.
    ///
    /// The samples that become the head of the window are attenuated first.
    fn advance(&mut self, chunk: &[f32]) {
        let n = self.window.len();
        let w = chunk.len();
        if w == 0 {
            return;
        }
        if w >= n {
            self.window.copy_from_slice(&chunk[w - n..]);
            return;
        }

        if self.decay != 1.0 {
            let end = (2 * w).min(n);
            for sample in &mut self.window[w..end] {
                *sample *= self.decay;
            }
        }
        self.window.copy_within(w.., 0);
        self.window[n - w..].copy_from_slice(chunk);
    }
}
