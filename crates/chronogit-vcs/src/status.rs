//! Repository status snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall repository status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    /// Branch name, or `HEAD` when detached
    pub current_ref: String,
    /// Full hash of HEAD, `None` on an unborn branch
    pub head: Option<String>,
    /// Number of modified or deleted tracked files
    pub uncommitted_changes: usize,
    /// Number of untracked files
    pub untracked_files: usize,
    /// Number of staged files
    pub staged_files: usize,
    /// Whether the repository is clean (no changes)
    pub is_clean: bool,
    /// Whether there are conflicts
    pub has_conflicts: bool,
    /// Last commit information
    pub last_commit: Option<CommitInfo>,
    /// Repository root path
    pub repository_root: String,
}

impl RepositoryStatus {
    /// Create a new repository status
    pub fn new(current_ref: impl Into<String>, repository_root: impl Into<String>) -> Self {
        Self {
            current_ref: current_ref.into(),
            head: None,
            uncommitted_changes: 0,
            untracked_files: 0,
            staged_files: 0,
            is_clean: true,
            has_conflicts: false,
            last_commit: None,
            repository_root: repository_root.into(),
        }
    }

    /// Update status with file counts
    pub fn with_counts(
        mut self,
        uncommitted: usize,
        untracked: usize,
        staged: usize,
        has_conflicts: bool,
    ) -> Self {
        self.uncommitted_changes = uncommitted;
        self.untracked_files = untracked;
        self.staged_files = staged;
        self.has_conflicts = has_conflicts;
        self.is_clean = uncommitted == 0 && untracked == 0 && staged == 0 && !has_conflicts;
        self
    }

    /// Set the HEAD hash
    pub fn with_head(mut self, head: Option<String>) -> Self {
        self.head = head;
        self
    }

    /// Set last commit information
    pub fn with_last_commit(mut self, commit: CommitInfo) -> Self {
        self.last_commit = Some(commit);
        self
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        if self.is_clean {
            return "Clean".to_string();
        }

        let mut parts = Vec::new();
        if self.staged_files > 0 {
            parts.push(format!("{}S", self.staged_files));
        }
        if self.uncommitted_changes > 0 {
            parts.push(format!("{}M", self.uncommitted_changes));
        }
        if self.untracked_files > 0 {
            parts.push(format!("{}U", self.untracked_files));
        }
        if self.has_conflicts {
            parts.push("C".to_string());
        }
        parts.join(" ")
    }
}

/// Information about a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit hash (short)
    pub hash: String,
    /// Commit message (first line)
    pub message: String,
    /// Author name
    pub author: String,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    /// Create a new commit info
    pub fn new(
        hash: impl Into<String>,
        message: impl Into<String>,
        author: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
            author: author.into(),
            timestamp,
        }
    }
}
