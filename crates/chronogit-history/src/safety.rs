//! Pre-flight validation before an undo

use std::sync::Arc;

use chronogit_vcs::GitBackend;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{OperationRecord, UndoData};

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyCheck {
    /// Short check name
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// What was observed
    pub detail: String,
}

impl SafetyCheck {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Result of checking one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyReport {
    /// Whether every check passed
    pub safe: bool,
    /// Detail of the first failed check
    pub reason: Option<String>,
    /// Every check performed, in order
    pub checks: Vec<SafetyCheck>,
}

impl SafetyReport {
    fn from_checks(checks: Vec<SafetyCheck>) -> Self {
        let reason = checks.iter().find(|c| !c.passed).map(|c| c.detail.clone());
        Self {
            safe: reason.is_none(),
            reason,
            checks,
        }
    }
}

/// Validates that the repository still matches what a record assumed
pub struct SafetyChecker {
    backend: Arc<dyn GitBackend>,
}

impl SafetyChecker {
    /// Create a checker using `backend`
    pub fn new(backend: Arc<dyn GitBackend>) -> Self {
        Self { backend }
    }

    /// Check whether undoing `record` is currently safe
    ///
    /// Stops at the first failing generic check; type-specific checks only
    /// run against a reachable, clean repository.
    pub fn check(&self, record: &OperationRecord) -> SafetyReport {
        let mut checks = Vec::new();
        let dir = &record.metadata.working_directory;

        if !dir.is_dir() {
            checks.push(SafetyCheck::fail(
                "directory",
                format!("working directory {} is not accessible", dir.display()),
            ));
            return SafetyReport::from_checks(checks);
        }
        checks.push(SafetyCheck::pass("directory", dir.display().to_string()));

        if !self.backend.is_repository(dir) {
            checks.push(SafetyCheck::fail(
                "repository",
                format!("{} is no longer a git repository", dir.display()),
            ));
            return SafetyReport::from_checks(checks);
        }
        checks.push(SafetyCheck::pass("repository", "git repository found"));

        let status = match self.backend.status(dir) {
            Ok(status) if status.is_clean => {
                checks.push(SafetyCheck::pass("clean", "working tree is clean"));
                status
            }
            Ok(status) => {
                checks.push(SafetyCheck::fail(
                    "clean",
                    format!("working tree has uncommitted changes ({})", status.summary()),
                ));
                return SafetyReport::from_checks(checks);
            }
            Err(e) => {
                checks.push(SafetyCheck::fail(
                    "clean",
                    format!("cannot read repository status: {}", e),
                ));
                return SafetyReport::from_checks(checks);
            }
        };

        match &record.undo_data {
            UndoData::Commit(commit) => {
                checks.push(self.check_head(record, &commit.commit_hash));
            }
            UndoData::Migrate(migrate) => {
                checks.push(check_branch(&status.current_ref, &migrate.branch));
                checks.push(self.check_backup(record));
            }
            UndoData::Batch(batch) => match batch.commits.last() {
                Some(last) => checks.push(self.check_head(record, &last.commit_hash)),
                None => checks.push(SafetyCheck::fail("batch", "batch contains no commits")),
            },
            UndoData::Config(_) => {}
        }

        let report = SafetyReport::from_checks(checks);
        debug!(
            "Safety check for {}: {}",
            record.id,
            if report.safe { "safe" } else { "unsafe" }
        );
        report
    }

    fn check_head(&self, record: &OperationRecord, expected: &str) -> SafetyCheck {
        match self.backend.head_hash(&record.metadata.working_directory) {
            Ok(Some(head)) if hashes_match(&head, expected) => {
                SafetyCheck::pass("head", format!("HEAD is at {}", expected))
            }
            Ok(Some(head)) => SafetyCheck::fail(
                "head",
                format!(
                    "HEAD has moved: expected {}, found {}",
                    expected,
                    short(&head)
                ),
            ),
            Ok(None) => SafetyCheck::fail("head", "repository has no commits"),
            Err(e) => SafetyCheck::fail("head", format!("cannot resolve HEAD: {}", e)),
        }
    }

    fn check_backup(&self, record: &OperationRecord) -> SafetyCheck {
        let Some(backup) = &record.backup_info else {
            return SafetyCheck::fail("backup", "no backup was recorded for this migration");
        };

        match self
            .backend
            .ref_exists(&record.metadata.working_directory, &backup.branch)
        {
            Ok(true) => SafetyCheck::pass("backup", format!("backup {} exists", backup.branch)),
            Ok(false) => SafetyCheck::fail(
                "backup",
                format!("backup branch {} no longer exists", backup.branch),
            ),
            Err(e) => SafetyCheck::fail("backup", format!("cannot list branches: {}", e)),
        }
    }
}

/// Shortest abbreviated hash accepted as a prefix match, as git abbreviates
pub const MIN_HASH_PREFIX: usize = 7;

/// Hashes match when equal, or when one is an abbreviation of the other
///
/// Abbreviations shorter than [`MIN_HASH_PREFIX`] only match exactly.
pub fn hashes_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let a = a.to_ascii_lowercase();
    let b = b.to_ascii_lowercase();
    if a == b {
        return true;
    }

    let (short, long) = if a.len() < b.len() { (&a, &b) } else { (&b, &a) };
    short.len() >= MIN_HASH_PREFIX && long.starts_with(short.as_str())
}

fn check_branch(current: &str, expected: &str) -> SafetyCheck {
    if current == expected {
        SafetyCheck::pass("branch", format!("{} is checked out", expected))
    } else {
        SafetyCheck::fail(
            "branch",
            format!(
                "migration rewrote {} but {} is checked out",
                expected, current
            ),
        )
    }
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
