//! Waterfall history: ring-buffered rows with adaptive normalization.

pub mod gradient;
pub mod store;

pub use gradient::{Gradient, Rgba};
pub use store::WaterfallStore;
