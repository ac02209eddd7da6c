//! Frame source that replays a WAV file in real time.

use super::assembler::{downmix, FrameAssembler};
use super::bridge::FrameSender;
use crate::error::{Result, WfallError};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Decoded mono audio.
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Reads a WAV file, mixing channels down to mono in `[-1, 1]`.
///
/// # Errors
/// - If the file cannot be opened or decoded
pub fn decode_wav(path: &Path) -> Result<WavAudio> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    tracing::debug!(
        "Decoded {}: {}Hz, {} channels, {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        interleaved.len()
    );

    Ok(WavAudio {
        samples: downmix(&interleaved, usize::from(spec.channels)).collect(),
        sample_rate: spec.sample_rate,
    })
}

/// Background replay of a decoded file. Dropping it stops playback.
pub struct WavSource {
    handle: Option<JoinHandle<()>>,
    stop: CancellationToken,
    sample_rate: u32,
    name: String,
}

impl WavSource {
    /// Decodes `path` and starts feeding `tx` one frame per frame period.
    ///
    /// The bridge closes when the file runs out or `cancel` fires.
    pub fn open(
        path: &Path,
        frame_size: usize,
        tx: FrameSender,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let audio = decode_wav(path)?;
        if audio.sample_rate == 0 {
            return Err(WfallError::InvalidConfig(format!(
                "{} reports a sample rate of 0",
                path.display()
            )));
        }

        let period = Duration::from_secs_f64(frame_size as f64 / f64::from(audio.sample_rate));
        let stop = cancel.child_token();
        let thread_stop = stop.clone();
        let sample_rate = audio.sample_rate;

        let handle = std::thread::Builder::new()
            .name("wav-source".into())
            .spawn(move || replay(audio.samples, frame_size, period, tx, thread_stop))
            .map_err(|e| WfallError::Device(format!("Failed to start WAV replay: {e}")))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::info!("Replaying {} at {}Hz", name, sample_rate);

        Ok(Self {
            handle: Some(handle),
            stop,
            sample_rate,
            name,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WavSource {
    fn drop(&mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("WAV replay thread panicked");
            }
        }
    }
}

/// Sends frames at a steady pace until the samples or the token run out.
fn replay(
    samples: Vec<f32>,
    frame_size: usize,
    period: Duration,
    mut tx: FrameSender,
    stop: CancellationToken,
) {
    let mut assembler = FrameAssembler::new(frame_size);
    let mut deadline = Instant::now();

    for chunk in samples.chunks(frame_size.max(1)) {
        if stop.is_cancelled() || tx.is_closed() {
            tracing::debug!("WAV replay stopped early");
            return;
        }
        assembler.extend(chunk.iter().copied(), |frame| tx.send(frame));

        deadline += period;
        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }
    tracing::info!("WAV replay finished");
}
