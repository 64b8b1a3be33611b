//! Annotation model and W3C Web Annotation interchange codec

mod codec;
mod types;

pub use codec::*;
pub use types::*;
