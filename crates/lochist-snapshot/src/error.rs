//! Snapshot error types.

use lochist_diff::DiffError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored diff could not be parsed or applied.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Snapshot, diff or baseline file not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A path escapes the project root or is otherwise unusable.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Baseline creation aborted; the partial copy has been discarded.
    #[error("Baseline creation failed at {}: {source}", path.display())]
    BaselineFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }
}
