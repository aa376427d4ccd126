//! Error types for mirror-core

use std::path::PathBuf;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration document lists no watch entries
    #[error("Configuration at {path} does not list any watched path")]
    EmptyConfig { path: PathBuf },

    /// The watched root is missing or not a directory
    #[error("Source root {path} is not a directory")]
    SourceNotDirectory { path: PathBuf },

    /// Source and backup roots overlap, so one would be mirrored into itself
    #[error("Backup root {backup} overlaps source root {source_root}")]
    OverlappingRoots { source_root: PathBuf, backup: PathBuf },

    /// Registering a directory with the notification backend failed
    #[error("Failed to watch {path}: {message}")]
    WatchFailed { path: PathBuf, message: String },

    /// The change log rejected or failed an operation
    #[error("Change log error: {message}")]
    ChangeLog { message: String },

    /// A command hook exited unsuccessfully or could not start
    #[error("Hook command `{command}` failed: {message}")]
    HookFailed { command: String, message: String },

    /// A command hook was interrupted by shutdown
    #[error("Hook command `{command}` cancelled")]
    HookCancelled { command: String },

    /// A blocking worker panicked or was aborted
    #[error("Background task failed: {message}")]
    Task { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Diff error from mirror-diff
    #[error(transparent)]
    Diff(#[from] mirror_diff::Error),

    /// SQLite error from the change log
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn task(error: tokio::task::JoinError) -> Self {
        Self::Task {
            message: error.to_string(),
        }
    }
}
