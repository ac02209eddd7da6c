//! List audio input devices that can feed the waterfall.

use crate::capture::device::suppress_alsa_warnings;
use crate::error::WfallError;
use cpal::traits::{DeviceTrait, HostTrait};

/// One row of the device listing.
struct DeviceEntry {
    name: String,
    is_default: bool,
    /// Native rate, channel count and sample format, if the device answers
    config: Option<(u32, u16, cpal::SampleFormat)>,
}

/// Prints every input device with its index and native configuration.
///
/// The index or the name can be used as `audio.device` in wfall.toml or
/// with `wfall --device`.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> anyhow::Result<()> {
    let entries = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());
        let devices = host
            .input_devices()
            .map_err(|e| WfallError::Device(format!("Failed to enumerate audio devices: {e}")))?;

        Ok(devices
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = device
                    .default_input_config()
                    .ok()
                    .map(|c| (c.sample_rate().0, c.channels(), c.sample_format()));
                Some(DeviceEntry {
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    config,
                })
            })
            .collect::<Vec<_>>())
    })?;

    if entries.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!("Audio input devices:");
    println!();
    for (index, entry) in entries.iter().enumerate() {
        println!("{}", format_entry(index, entry));
    }
    println!("Use the ID or name as audio.device in wfall.toml, or pass --device.");

    Ok(())
}

fn format_entry(index: usize, entry: &DeviceEntry) -> String {
    let default_indicator = if entry.is_default { " [DEFAULT]" } else { "" };
    let config = match entry.config {
        Some((rate, channels, format)) => format!("{rate}Hz, {channels} channels, {format:?}"),
        None => "configuration unavailable".to_string(),
    };
    format!(
        "  ID: {index}\n    Name: {}{default_indicator}\n    Native: {config}\n",
        entry.name
    )
}
