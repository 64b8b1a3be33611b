//! Refine Page Core
//!
//! The snapshot normalization and annotation-serialization core of Refine Page.
//! This crate turns captured web documents into inert, self-contained snapshots,
//! maps annotations to and from the W3C Web Annotation interchange format, and
//! persists both through a pluggable storage layer.
//!
//! # Modules
//!
//! - `html`: inert-ification transform and additional-style collection
//! - `snapshot`: the canonical snapshot model
//! - `annotations`: annotation model and W3C interchange codec
//! - `storage`: the `SnapshotStore` abstraction with local, remote and in-memory backends
//! - `archive`: portable ZIP bundle export/import
//! - `capture`: capture pipeline and the message contract with the capture/annotator UIs

pub mod annotations;
pub mod archive;
pub mod capture;
pub mod config;
pub mod error;
pub mod html;
pub mod snapshot;
pub mod storage;

pub use error::{AppError, Result};
