//! Error types for the capture and signal-processing pipeline.
//!
//! Command handlers wrap these in `anyhow::Error`; steady-state anomalies
//! (dropped frames, degenerate ranges) never surface here.

use thiserror::Error;

/// Errors that abort pipeline startup.
#[derive(Error, Debug)]
pub enum WfallError {
    /// A setting is out of range or inconsistent with another one
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The forward transform could not be planned
    #[error("Transform initialization failed: {0}")]
    Transform(String),
    /// The frame source closed before delivering any samples
    #[error("Audio source ended before delivering any samples")]
    SourceExhausted,
    /// The audio input device could not be opened or started
    #[error("Audio device error: {0}")]
    Device(String),
    /// The WAV input file could not be read
    #[error("WAV input error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, WfallError>;
