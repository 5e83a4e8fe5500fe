//! Error types for the Rewind engine.

use thiserror::Error;

/// All possible errors from the Rewind engine.
///
/// Every error is recoverable: an operation that fails leaves the history
/// exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("invalid index {index} for sequence of length {len}")]
    InvalidIndex { index: i64, len: usize },

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    // Navigation boundaries
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    // Persistence errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("no snapshot stored under key: {0}")]
    SnapshotNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Build an [`Error::InvalidIndex`] from a `usize` position.
    pub(crate) fn invalid_index(index: usize, len: usize) -> Self {
        Error::InvalidIndex {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            len,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
