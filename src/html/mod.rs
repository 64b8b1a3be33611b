//! HTML processing
//!
//! The inert-ification transform and the additional-style collector that
//! feeds it. Both are pure and synchronous.

mod inert;
mod styles;

pub use inert::*;
pub use styles::*;
