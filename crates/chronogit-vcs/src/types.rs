//! Common types for VCS operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a local Git branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name
    pub name: String,
    /// Whether this is the current branch
    pub is_current: bool,
    /// Full hash of the commit the branch points at
    pub target: Option<String>,
    /// Last commit timestamp
    pub last_commit_time: Option<DateTime<Utc>>,
}

impl Branch {
    /// Create a new branch
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_current: false,
            target: None,
            last_commit_time: None,
        }
    }

    /// Mark this branch as current
    pub fn current(mut self) -> Self {
        self.is_current = true;
        self
    }

    /// Set the commit this branch points at
    pub fn with_target(mut self, hash: impl Into<String>, time: DateTime<Utc>) -> Self {
        self.target = Some(hash.into());
        self.last_commit_time = Some(time);
        self
    }
}

/// How far a reset rewinds repository state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    /// Move HEAD only
    Soft,
    /// Move HEAD and reset the index
    Mixed,
    /// Move HEAD, reset the index and the working tree
    #[default]
    Hard,
}

impl From<ResetMode> for git2::ResetType {
    fn from(mode: ResetMode) -> Self {
        match mode {
            ResetMode::Soft => git2::ResetType::Soft,
            ResetMode::Mixed => git2::ResetType::Mixed,
            ResetMode::Hard => git2::ResetType::Hard,
        }
    }
}
