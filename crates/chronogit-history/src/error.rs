//! Error types for the operation history

use chronogit_vcs::VcsError;
use thiserror::Error;

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur while recording or undoing operations
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Operation not found in history
    #[error("Operation not found: {0}")]
    NotFound(String),

    /// Operation was recorded as not undoable
    #[error("Operation {0} cannot be undone")]
    NotUndoable(String),

    /// Operation has already been undone
    #[error("Operation {0} has already been undone")]
    AlreadyUndone(String),

    /// Repository state no longer matches what the record assumed
    #[error("Unsafe to undo {id}: {reason}")]
    UnsafeState { id: String, reason: String },

    /// The reversal itself failed; the record stays `completed`
    #[error("Undo of {id} failed: {message}")]
    ExecutionFailure { id: String, message: String },

    /// An id was already present in the store
    #[error("Duplicate operation id: {0}")]
    DuplicateId(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Export error
    #[error("Export error: {0}")]
    Export(String),

    /// Repository backend error outside of an undo
    #[error("VCS error: {0}")]
    Vcs(#[from] VcsError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HistoryError {
    /// Create a new UnsafeState error
    pub fn unsafe_state(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsafeState {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ExecutionFailure error
    pub fn execution_failure(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionFailure {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a new Storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new Config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Validation-level errors never touch history or repository state
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::NotUndoable(_)
                | Self::AlreadyUndone(_)
                | Self::UnsafeState { .. }
        )
    }
}

impl From<config::ConfigError> for HistoryError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
