//! Audio frame sources and the bridge that rate-limits them.
//!
//! A source produces fixed-size mono frames on its own thread (the audio
//! callback or a file replay thread) and hands them to the bridge without
//! ever blocking.

pub mod assembler;
pub mod bridge;
pub mod device;
pub mod wav;

pub use bridge::{bridge, FrameReceiver, FrameSender};
pub use device::DeviceSource;
pub use wav::WavSource;

/// Whichever source is currently feeding the bridge.
pub enum Source {
    Device(DeviceSource),
    Wav(WavSource),
}

impl Source {
    /// Rate the frames are actually delivered at.
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Device(source) => source.sample_rate(),
            Self::Wav(source) => source.sample_rate(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Device(source) => source.name(),
            Self::Wav(source) => source.name(),
        }
    }
}
