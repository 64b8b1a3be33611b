//! Error types for the Refine Page core

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::storage::StorageError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Umbrella error for pipeline-level operations
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
