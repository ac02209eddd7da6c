//! Live spectrogram: capture, transform and render until the user quits.

use crate::capture::{bridge, DeviceSource, FrameReceiver, FrameSender, Source, WavSource};
use crate::config::{BankConfig, WfallConfig};
use crate::dsp::Bank;
use crate::error::WfallError;
use crate::pipeline::{Pipeline, SpectralRow};
use crate::ui::{ErrorScreen, UiCommand, WaterfallTui};
use crate::waterfall::WaterfallStore;
use crossterm::event;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Bank layout selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BankKind {
    Linear,
    EqualTemperament,
}

/// Command-line overrides for the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub device: Option<String>,
    pub input: Option<PathBuf>,
    pub bank: Option<BankKind>,
}

impl RunOptions {
    /// Writes the overrides into `config`.
    ///
    /// Switching bank kind replaces the bank with that kind's defaults;
    /// naming the kind already configured keeps the file's parameters.
    pub fn apply(&self, config: &mut WfallConfig) {
        if let Some(device) = &self.device {
            config.audio.device = device.clone();
        }
        match (self.bank, &config.bank) {
            (Some(BankKind::Linear), BankConfig::EqualTemperament { .. }) => {
                config.bank = BankConfig::default();
            }
            (Some(BankKind::EqualTemperament), BankConfig::Linear { .. }) => {
                config.bank = BankConfig::equal_temperament();
            }
            _ => {}
        }
    }
}

/// Runs the waterfall until q, Escape, Ctrl+C or SIGTERM.
///
/// # Errors
/// - If the configuration is invalid
/// - If no audio source can be opened or it delivers nothing in time
/// - If the transform cannot be planned
/// - If the terminal fails
pub async fn handle_run(options: RunOptions) -> anyhow::Result<()> {
    tracing::info!("=== wfall started ===");

    let mut config = match WfallConfig::load() {
        Ok(config) => config,
        Err(err) => {
            return fail_startup(
                "Configuration Error",
                &format!("{err}\n\nPlease check your ~/.config/wfall/wfall.toml file and try again."),
                err,
            )
        }
    };
    options.apply(&mut config);
    if let Err(err) = config.validate() {
        return fail_startup("Configuration Error", &err.to_string(), err.into());
    }

    tracing::info!(
        "Configuration loaded: device={}, transform={}x{}, bank={}, height={}",
        config.audio.device,
        config.transform.size,
        config.transform.split,
        config.bank,
        config.display.height
    );

    let cancel = CancellationToken::new();
    let (tx, frames) = bridge();
    let started = match start(&config, &options, tx, frames, &cancel).await {
        Ok(started) => started,
        Err(err) => {
            cancel.cancel();
            return fail_startup("Startup Error", &err.to_string(), err.into());
        }
    };

    let result = render_loop(&config, started, cancel).await;
    tracing::info!("=== wfall exited ===");
    result
}

/// Everything running once startup succeeded.
struct Started {
    source: Source,
    bank: Bank,
    pipeline: Pipeline,
    rows: mpsc::Receiver<SpectralRow>,
}

/// Opens the source, waits for its first frame and starts the engine.
async fn start(
    config: &WfallConfig,
    options: &RunOptions,
    tx: FrameSender,
    mut frames: FrameReceiver,
    cancel: &CancellationToken,
) -> Result<Started, WfallError> {
    let source = match &options.input {
        Some(path) => Source::Wav(WavSource::open(path, config.audio.frame_size, tx, cancel)?),
        None => Source::Device(DeviceSource::open(
            &config.audio.device,
            config.audio.frame_size,
            tx,
        )?),
    };

    let sample_rate = source.sample_rate();
    if sample_rate != config.audio.sample_rate {
        tracing::warn!(
            "{} delivers {}Hz instead of the configured {}Hz; using {}Hz",
            source.name(),
            sample_rate,
            config.audio.sample_rate,
            sample_rate
        );
    }

    let timeout = Duration::from_millis(config.audio.startup_timeout_ms);
    match tokio::time::timeout(timeout, frames.ready()).await {
        Ok(true) => tracing::debug!("First frame received from {}", source.name()),
        Ok(false) | Err(_) => {
            tracing::error!(
                "{} delivered no audio within {}ms",
                source.name(),
                config.audio.startup_timeout_ms
            );
            return Err(WfallError::SourceExhausted);
        }
    }

    let bank = Bank::from_config(&config.bank, sample_rate, config.transform.size)?;
    tracing::debug!(
        "Bank covers bins {}..{} in {} buckets of {}..{} bins",
        bank.min_bin(),
        bank.max_bin(),
        bank.output_width(),
        bank.widths().first().unwrap_or(&0),
        bank.widths().last().unwrap_or(&0)
    );

    let (pipeline, rows) = Pipeline::spawn(&config.transform, frames, cancel.clone())?;
    Ok(Started {
        source,
        bank,
        pipeline,
        rows,
    })
}

async fn render_loop(
    config: &WfallConfig,
    started: Started,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let Started {
        source,
        bank,
        pipeline,
        mut rows,
    } = started;
    let sample_rate = source.sample_rate();
    let store = WaterfallStore::new(
        bank.output_width(),
        config.display.height,
        config.display.range_release,
    );

    let terminate = Arc::new(AtomicBool::new(false));
    let registered = signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&terminate))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"));
    let mut tui = match registered
        .and_then(|_| WaterfallTui::enter(store, bank, source.name().to_string()))
    {
        Ok(tui) => tui,
        Err(e) => {
            pipeline.shutdown().await;
            return Err(e.context("Failed to initialize UI"));
        }
    };

    let fps = config.display.fps(sample_rate);
    tracing::debug!("Rendering at {:.1} fps", fps);
    let period = Duration::from_secs_f64(1.0 / fps).max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            _ = ticker.tick() => {}
        }

        if terminate.load(Ordering::Relaxed) {
            tracing::info!("Received SIGTERM: quitting");
            break Ok(());
        }

        match poll_input(&mut tui) {
            Ok(UiCommand::Quit) => break Ok(()),
            Ok(UiCommand::Continue) => {}
            Err(e) => break Err(anyhow::anyhow!("Input handling error: {e}")),
        }

        tui.drain(&mut rows);
        if !tui.needs_redraw() {
            continue;
        }
        if let Err(e) = tui.draw() {
            break Err(anyhow::anyhow!("Render failed: {e}"));
        }
    };

    let cleanup = tui.cleanup();
    cancel.cancel();
    pipeline.shutdown().await;
    drop(source);
    cleanup?;
    result
}

/// Applies every pending terminal event without blocking.
fn poll_input<B: ratatui::backend::Backend>(
    tui: &mut WaterfallTui<B>,
) -> std::io::Result<UiCommand> {
    while event::poll(Duration::ZERO)? {
        if tui.handle_event(event::read()?) == UiCommand::Quit {
            return Ok(UiCommand::Quit);
        }
    }
    Ok(UiCommand::Continue)
}

/// Shows a startup failure on the error page, then returns it.
fn fail_startup(title: &str, detail: &str, err: anyhow::Error) -> anyhow::Result<()> {
    tracing::error!("{title}: {err}");
    let mut error_screen = ErrorScreen::new()?;
    error_screen.show_error(&format!("{title}:\n\n{detail}"))?;
    error_screen.cleanup()?;
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_override() {
        let mut config = WfallConfig::default();
        RunOptions {
            device: Some("2".into()),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.audio.device, "2");
    }

    #[test]
    fn test_bank_override_switches_kind() {
        let mut config = WfallConfig::default();
        let options = RunOptions {
            bank: Some(BankKind::EqualTemperament),
            ..Default::default()
        };
        options.apply(&mut config);
        assert_eq!(config.bank, BankConfig::equal_temperament());

        RunOptions {
            bank: Some(BankKind::Linear),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.bank, BankConfig::default());
    }

    #[test]
    fn test_bank_override_keeps_matching_parameters() {
        let mut config = WfallConfig::default();
        config.bank = BankConfig::EqualTemperament {
            start_hz: 110.0,
            steps: 24,
        };
        RunOptions {
            bank: Some(BankKind::EqualTemperament),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(
            config.bank,
            BankConfig::EqualTemperament {
                start_hz: 110.0,
                steps: 24
            }
        );
    }

    #[tokio::test]
    async fn test_silent_source_is_exhausted() {
        let path = std::env::temp_dir().join(format!("wfall_empty_{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        hound::WavWriter::create(&path, spec).unwrap().finalize().unwrap();

        let config = WfallConfig::default();
        let options = RunOptions {
            input: Some(path.clone()),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let (tx, frames) = bridge();
        let result = start(&config, &options, tx, frames, &cancel).await;
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(WfallError::SourceExhausted)));
    }

    #[tokio::test]
    async fn test_wav_source_starts_pipeline() {
        let path = std::env::temp_dir().join(format!("wfall_tone_{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..8000 {
            let t = i as f32 / 8000.0;
            writer
                .write_sample(((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 10000.0) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();

        let config = WfallConfig::default();
        let options = RunOptions {
            input: Some(path.clone()),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let (tx, frames) = bridge();
        let started = start(&config, &options, tx, frames, &cancel).await.unwrap();
        assert_eq!(started.source.sample_rate(), 8000);

        let mut rows = started.rows;
        let row = tokio::time::timeout(Duration::from_secs(5), rows.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.len(), config.transform.size / 2);
        assert_eq!(started.bank.apply(&row).len(), started.bank.output_width());

        started.pipeline.shutdown().await;
        drop(started.source);
        std::fs::remove_file(&path).ok();
    }
}
