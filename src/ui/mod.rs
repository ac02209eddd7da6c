//! Terminal surfaces: the live waterfall and the startup error page.

pub mod error;
pub mod tui;
pub mod waterfall;

pub use error::ErrorScreen;
pub use tui::{UiCommand, WaterfallTui};
