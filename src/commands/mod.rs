//! Command handlers for wfall.
//!
//! # Commands
//! - `run`: live waterfall from a device or WAV file (default)
//! - `list_devices`: list audio input devices
//! - `logs`: print recent log entries
//! - `config`: open the configuration file in an editor

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod run;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use run::{handle_run, BankKind, RunOptions};
