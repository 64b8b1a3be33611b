//! Snapshot model
//!
//! The canonical in-memory representation of a captured page plus its
//! annotations, shared by the capture pipeline, the storage providers
//! and the archive packer.

mod types;

pub use types::*;
