// CLI error types and user-facing messages

use chronogit_history::HistoryError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("{failed} of {selected} undo(s) failed")]
    PartialUndo { failed: usize, selected: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'chronogit --help' for usage information.",
                    message
                )
            }
            CliError::History(HistoryError::NotFound(id)) => {
                format!(
                    "Operation '{}' not found.\n\nRun 'chronogit history list' to see recorded operations.",
                    id
                )
            }
            CliError::History(e @ HistoryError::UnsafeState { .. }) => {
                format!(
                    "{}\n\nResolve the problem, preview with --dry-run, or re-run with --force to skip safety checks.",
                    e
                )
            }
            CliError::History(e @ HistoryError::ExecutionFailure { .. }) => {
                format!("{}\n\nThe operation is still recorded as completed.", e)
            }
            CliError::History(e @ HistoryError::Storage(_)) => {
                format!("{}\n\nCheck the history file, or clear it with 'chronogit history clear'.", e)
            }
            CliError::History(e) => e.to_string(),
            CliError::PartialUndo { failed, selected } => {
                format!(
                    "{} of {} undo(s) failed.\n\nSee the messages above; completed undos were kept.",
                    failed, selected
                )
            }
            CliError::Io(e) => {
                format!("File operation failed: {}", e)
            }
            CliError::Config(msg) => {
                format!(
                    "Configuration error: {}\n\nCheck ~/.config/chronogit/history.toml and CHRONOGIT_* variables.",
                    msg
                )
            }
            CliError::Internal(msg) => {
                format!("Internal error: {}\n\nPlease report this issue.", msg)
            }
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }
}

pub type CliResult<T> = Result<T, CliError>;
