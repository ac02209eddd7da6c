//! Worker topology between the bridge and the render driver.
//!
//! The transform engine runs on its own thread: it takes frames from the
//! bridge, emits `split` spectral rows per frame into a bounded channel of
//! the same capacity, and blocks on that channel when the renderer falls
//! behind. A shared cancellation token stops every worker; `shutdown` joins
//! them before the caller tears anything else down.

use crate::capture::FrameReceiver;
use crate::config::TransformConfig;
use crate::dsp::SlidingTransform;
use crate::error::{Result, WfallError};
use std::thread::JoinHandle;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One spectral row: the first half of a transform output.
pub type SpectralRow = Vec<f32>;

/// Handle to the running workers.
pub struct Pipeline {
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Plans the transform and starts the engine worker.
    ///
    /// The engine gets a dedicated `transform` thread so the transform work
    /// never stalls the runtime that drives rendering. Must be called from
    /// within a tokio runtime.
    ///
    /// Returns the pipeline handle and the receiver of spectral rows.
    ///
    /// # Errors
    /// Fails before spawning anything if the transform cannot be planned,
    /// or if the worker thread cannot be started.
    pub fn spawn(
        transform: &TransformConfig,
        frames: FrameReceiver,
        cancel: CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<SpectralRow>)> {
        let engine = SlidingTransform::new(transform.size, transform.split, transform.decay)?;
        let (tx, rx) = mpsc::channel(transform.split);

        tracing::info!(
            "Transform engine started: {} points, split {}, decay {}",
            transform.size,
            transform.split,
            transform.decay
        );
        let runtime = Handle::current();
        let worker_cancel = cancel.clone();
        let worker = std::thread::Builder::new()
            .name("transform".into())
            .spawn(move || runtime.block_on(run_engine(engine, frames, tx, worker_cancel)))
            .map_err(|e| WfallError::Transform(format!("worker thread: {e}")))?;

        Ok((
            Self {
                cancel,
                workers: vec![worker],
            },
            rx,
        ))
    }

    /// Cancels every worker and waits for all of them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for worker in self.workers {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            let joined = tokio::task::spawn_blocking(move || worker.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                tracing::error!("Pipeline worker {} panicked", name);
            }
        }
        tracing::debug!("Pipeline stopped");
    }
}

/// Engine worker loop. Dropping `rows` on exit closes the row channel.
async fn run_engine(
    mut engine: SlidingTransform,
    mut frames: FrameReceiver,
    rows: mpsc::Sender<SpectralRow>,
    cancel: CancellationToken,
) {
    let mut ingested = 0u64;

    'frames: loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Transform worker cancelled");
                break;
            }
            frame = frames.recv() => frame,
        };

        let Some(frame) = frame else {
            tracing::info!(
                "Frame source ended after {} frames ({} dropped)",
                ingested,
                frames.dropped()
            );
            break;
        };

        ingested += 1;
        if ingested % 1000 == 0 {
            tracing::debug!("Ingested {} frames, {} dropped", ingested, frames.dropped());
        }

        for row in engine.ingest(&frame.samples) {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Transform worker cancelled mid-frame");
                    break 'frames;
                }
                sent = rows.send(row) => {
                    if sent.is_err() {
                        tracing::debug!("Row receiver dropped; stopping transform worker");
                        break 'frames;
                    }
                }
            }
        }
    }
}
