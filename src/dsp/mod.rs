//! Signal processing: sliding-window transform and frequency banks.

pub mod bank;
pub mod pitch;
pub mod plan;
pub mod transform;

pub use bank::Bank;
pub use pitch::note_name;
pub use transform::SlidingTransform;
