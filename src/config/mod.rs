//! Configuration management for wfall.
//!
//! This module handles loading application configuration from a TOML file
//! in the user's config directory.

pub mod file;

pub use file::{get_config_path, AudioConfig, BankConfig, DisplayConfig, TransformConfig, WfallConfig};
