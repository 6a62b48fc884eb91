//! Error types for VCS operations

use thiserror::Error;

/// Result type for VCS operations
pub type Result<T> = std::result::Result<T, VcsError>;

/// Errors that can occur during VCS operations
#[derive(Debug, Error)]
pub enum VcsError {
    /// Git repository error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Repository not found
    #[error("Repository not found at path: {path}")]
    RepositoryNotFound { path: String },

    /// Invalid repository state
    #[error("Invalid repository state: {message}")]
    InvalidState { message: String },

    /// Reference could not be resolved to a commit
    #[error("Reference not found: {reference}")]
    RefNotFound { reference: String },

    /// Another branch is checked out than the one an operation targets
    #[error("Expected branch {expected} to be checked out, found {found}")]
    BranchMismatch { expected: String, found: String },

    /// Invalid branch name
    #[error("Invalid branch name: {name}")]
    InvalidBranch { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VcsError {
    /// Create a new InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a new RefNotFound error
    pub fn ref_not_found(reference: impl Into<String>) -> Self {
        Self::RefNotFound {
            reference: reference.into(),
        }
    }
}
