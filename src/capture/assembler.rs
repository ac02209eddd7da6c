//! Fixed-size frame assembly from irregular callback buffers.

/// Collects mono samples and cuts them into frames of `frame_size`.
pub struct FrameAssembler {
    pending: Vec<f32>,
    frame_size: usize,
}

impl FrameAssembler {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            pending: Vec::with_capacity(frame_size),
            frame_size,
        }
    }

    /// Appends samples, calling `emit` once for every completed frame.
    pub fn extend<I, F>(&mut self, samples: I, mut emit: F)
    where
        I: IntoIterator<Item = f32>,
        F: FnMut(Vec<f32>),
    {
        for sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.frame_size {
                let frame = std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.frame_size),
                );
                emit(frame);
            }
        }
    }

    /// Samples waiting for the next frame.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Averages interleaved channels into one mono sample per frame.
pub fn downmix(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved
        .chunks(channels.max(1))
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
}
