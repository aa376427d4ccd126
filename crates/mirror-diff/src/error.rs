//! Error types for mirror-diff

/// Result type for mirror-diff operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-diff operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Span at offset {offset} does not fit the base text ({len} chars)")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("Deleted text at offset {offset} does not match the base text")]
    DeleteMismatch { offset: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
