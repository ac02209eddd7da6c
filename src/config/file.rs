//! Configuration file management for wfall.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory.

use crate::error::WfallError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Frequency bank selection.
///
/// Serialized with an internal `kind` tag, e.g. `kind = "linear"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BankConfig {
    /// Fixed-width buckets between two frequencies
    Linear {
        min_hz: f32,
        max_hz: f32,
        /// Number of transform bins averaged into each bucket
        divisor: usize,
    },
    /// One bucket per semitone starting at `start_hz`
    EqualTemperament { start_hz: f32, steps: usize },
}

impl Default for BankConfig {
    fn default() -> Self {
        Self::Linear {
            min_hz: 0.0,
            max_hz: 2000.0,
            divisor: 2,
        }
    }
}

impl BankConfig {
    /// Six octaves of semitones starting at G1.
    pub fn equal_temperament() -> Self {
        Self::EqualTemperament {
            start_hz: 49.0,
            steps: 12 * 6,
        }
    }
}

impl std::fmt::Display for BankConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear {
                min_hz,
                max_hz,
                divisor,
            } => write!(f, "linear {min_hz}-{max_hz}Hz /{divisor}"),
            Self::EqualTemperament { start_hz, steps } => {
                write!(f, "equal-temperament {start_hz}Hz x{steps}")
            }
        }
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `wfall list-devices`
    /// - device name from `wfall list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Expected sample rate in Hz (the device or file rate wins if it differs)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Samples per captured frame
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// How long to wait for the first frame before giving up
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_frame_size() -> usize {
    1024
}

fn default_startup_timeout_ms() -> u64 {
    3000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            frame_size: default_frame_size(),
            startup_timeout_ms: default_startup_timeout_ms(),
        }
    }
}

/// Sliding-window transform configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformConfig {
    /// Window length in samples
    #[serde(default = "default_transform_size")]
    pub size: usize,
    /// Window advances per incoming frame
    #[serde(default = "default_split")]
    pub split: usize,
    /// Attenuation applied to the oldest retained samples before each shift (1.0 disables)
    #[serde(default = "default_decay")]
    pub decay: f32,
}

fn default_transform_size() -> usize {
    4096
}

fn default_split() -> usize {
    4
}

fn default_decay() -> f32 {
    0.25
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            size: default_transform_size(),
            split: default_split(),
            decay: default_decay(),
        }
    }
}

/// Waterfall display configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Rows of history kept in the waterfall
    #[serde(default = "default_height")]
    pub height: usize,
    /// Render ticks per second; derived from the sample rate when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Fraction by which the normalization range relaxes toward each new row (0 = latch)
    #[serde(default)]
    pub range_release: f32,
}

fn default_height() -> usize {
    256
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            height: default_height(),
            fps: None,
            range_release: 0.0,
        }
    }
}

impl DisplayConfig {
    /// Returns the render tick rate, assuming 1024-sample device buffers when unset.
    pub fn fps(&self, sample_rate: u32) -> f64 {
        self.fps
            .unwrap_or_else(|| f64::from(1 + sample_rate / 1024))
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WfallConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl WfallConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config_content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        Self::from_toml_str(&config_content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: WfallConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Checks that the settings describe a pipeline that can run.
    ///
    /// # Errors
    /// Returns `WfallError::InvalidConfig` naming the first offending setting.
    pub fn validate(&self) -> Result<(), WfallError> {
        let invalid = |msg: String| Err(WfallError::InvalidConfig(msg));

        if self.audio.sample_rate == 0 {
            return invalid("audio.sample_rate must be positive".into());
        }
        if self.transform.size < 2 || self.transform.size % 2 != 0 {
            return invalid(format!(
                "transform.size must be an even number of at least 2, got {}",
                self.transform.size
            ));
        }
        if self.transform.split == 0 {
            return invalid("transform.split must be at least 1".into());
        }
        if self.audio.frame_size < self.transform.split {
            return invalid(format!(
                "audio.frame_size ({}) must be at least transform.split ({})",
                self.audio.frame_size, self.transform.split
            ));
        }
        if !(0.0..=1.0).contains(&self.transform.decay) {
            return invalid(format!(
                "transform.decay must be within 0.0..=1.0, got {}",
                self.transform.decay
            ));
        }
        match &self.bank {
            BankConfig::Linear {
                min_hz,
                max_hz,
                divisor,
            } => {
                if *divisor == 0 {
                    return invalid("bank.divisor must be at least 1".into());
                }
                if !(*min_hz >= 0.0 && max_hz > min_hz) {
                    return invalid(format!(
                        "bank range {min_hz}-{max_hz}Hz is empty or negative"
                    ));
                }
            }
            BankConfig::EqualTemperament { start_hz, steps } => {
                if *steps == 0 || !(*start_hz > 0.0) {
                    return invalid(format!(
                        "bank needs a positive start_hz and step count, got {start_hz}Hz x{steps}"
                    ));
                }
            }
        }
        if self.display.height == 0 {
            return invalid("display.height must be at least 1".into());
        }
        if let Some(fps) = self.display.fps {
            if !(fps > 0.0) {
                return invalid(format!("display.fps must be positive, got {fps}"));
            }
        }
        if !(0.0..=1.0).contains(&self.display.range_release) {
            return invalid(format!(
                "display.range_release must be within 0.0..=1.0, got {}",
                self.display.range_release
            ));
        }
        Ok(())
    }
}

/// Retrieves the path to the config file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("wfall");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("wfall.toml"))
}
