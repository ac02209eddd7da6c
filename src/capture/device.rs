//! Live frame source backed by an audio input device.
//!
//! Opens the configured input device at its native rate and format, mixes
//! the interleaved channels down to mono and pushes fixed-size frames into
//! the bridge straight from the audio callback.

use super::assembler::{downmix, FrameAssembler};
use super::bridge::FrameSender;
use crate::error::{Result, WfallError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, StreamConfig};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// A running capture stream. Dropping it stops capture and closes the bridge.
pub struct DeviceSource {
    /// Kept alive for the lifetime of the capture
    _stream: cpal::Stream,
    sample_rate: u32,
    name: String,
}

impl DeviceSource {
    /// Starts capturing from `device_spec` into `tx`.
    ///
    /// # Arguments
    /// * `device_spec` - "default", a device name, or a numeric index from `wfall list-devices`
    /// * `frame_size` - Samples per frame handed to the bridge
    ///
    /// # Errors
    /// - If the specified device is not available
    /// - If the device uses an unsupported sample format
    /// - If the stream cannot be built or started
    pub fn open(device_spec: &str, frame_size: usize, tx: FrameSender) -> Result<Self> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if device_spec == "default" {
                host.default_input_device()
                    .ok_or_else(|| WfallError::Device("No audio input device available".into()))
            } else {
                find_device_by_name(&host, device_spec)
            }
        })?;

        let name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", name);

        let device_config = device
            .default_input_config()
            .map_err(|e| WfallError::Device(format!("Failed to query input config: {e}")))?;
        let sample_rate = device_config.sample_rate().0;
        let channels = usize::from(device_config.channels());
        let sample_format = device_config.sample_format();

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let config: StreamConfig = device_config.into();
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, frame_size, tx),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, frame_size, tx),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, frame_size, tx),
            other => {
                return Err(WfallError::Device(format!(
                    "Unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|e| WfallError::Device(format!("Failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| WfallError::Device(format!("Failed to start input stream: {e}")))?;

        tracing::debug!("Audio stream started");
        Ok(Self {
            _stream: stream,
            sample_rate,
            name,
        })
    }

    /// Native sample rate of the device.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builds an input stream for sample type `T` that feeds mono frames to `tx`.
fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    frame_size: usize,
    mut tx: FrameSender,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: cpal::FromSample<T>,
{
    let mut assembler = FrameAssembler::new(frame_size);
    let mut scratch = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mono = mono_samples(data, channels, &mut scratch);
            assembler.extend(mono, |frame| tx.send(frame));
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    )
}

/// Converts one callback buffer to `f32` in `scratch` and downmixes it.
fn mono_samples<'a, T>(
    data: &[T],
    channels: usize,
    scratch: &'a mut Vec<f32>,
) -> impl Iterator<Item = f32> + 'a
where
    T: SizedSample,
    f32: cpal::FromSample<T>,
{
    scratch.clear();
    scratch.extend(data.iter().map(|&s| s.to_sample::<f32>()));
    let converted: &'a [f32] = scratch;
    downmix(converted, channels)
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<Device> {
    let mut devices = host
        .input_devices()
        .map_err(|e| WfallError::Device(format!("Failed to enumerate devices: {e}")))?;

    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<Device> = devices.collect();
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            WfallError::Device(format!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        });
    }

    devices
        .find(|device| device.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| {
            WfallError::Device(format!(
                "Audio input device '{device_spec}' not found. Use 'wfall list-devices' to see available devices."
            ))
        })
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| WfallError::Device(format!("Failed to open /dev/null: {e}")))?;

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(WfallError::Device("Failed to duplicate stderr".into()));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(WfallError::Device("Failed to redirect stderr".into()));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
