//! Diff error types.

use thiserror::Error;

/// Result type for diff operations.
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors that can occur while parsing or applying a diff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// Unparseable hunk header, or an edit line outside any hunk.
    #[error("Malformed diff: {0}")]
    MalformedDiff(String),

    /// A hunk references lines beyond the end of the original.
    #[error("Hunk at original line {start} is out of bounds (original has {available} lines)")]
    RangeOutOfBounds { start: usize, available: usize },
}

impl DiffError {
    /// Create a malformed diff error pointing at a line of the diff text.
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedDiff(format!("line {}: {}", line, message.into()))
    }
}
