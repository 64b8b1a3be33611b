//! Storage error types

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Write attempted on a provider constructed without write capability
    #[error("store is read-only: {operation} is not available")]
    ReadOnly { operation: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True when the error is the read-only capability rejection
    pub fn is_read_only(&self) -> bool {
        matches!(self, StorageError::ReadOnly { .. })
    }
}
