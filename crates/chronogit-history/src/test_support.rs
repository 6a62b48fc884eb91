//! In-memory repository backend for unit tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use chronogit_vcs::{GitBackend, RepositoryStatus, ResetMode, Result, VcsError};
use serde_json::Value;

use crate::models::{
    CommitUndo, OperationMetadata, OperationRecord, OperationStatus, UndoData,
};

#[derive(Debug, Clone, Default)]
struct FakeRepo {
    head: Option<String>,
    current_branch: String,
    dirty: bool,
    branches: HashMap<String, String>,
    resets: Vec<String>,
}

/// Fake backend keyed by repository path
#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    repos: Mutex<HashMap<PathBuf, FakeRepo>>,
    fail_resets: Mutex<bool>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_repo(&self, path: &Path, head: &str) {
        self.repos.lock().unwrap().insert(
            path.to_path_buf(),
            FakeRepo {
                head: Some(head.to_string()),
                current_branch: "main".to_string(),
                ..FakeRepo::default()
            },
        );
    }

    pub(crate) fn set_head(&self, path: &Path, head: &str) {
        self.with_repo(path, |repo| repo.head = Some(head.to_string()))
            .unwrap();
    }

    pub(crate) fn head(&self, path: &Path) -> Option<String> {
        self.repos
            .lock()
            .unwrap()
            .get(path)
            .and_then(|r| r.head.clone())
    }

    pub(crate) fn checkout(&self, path: &Path, branch: &str) {
        self.with_repo(path, |repo| repo.current_branch = branch.to_string())
            .unwrap();
    }

    pub(crate) fn set_dirty(&self, path: &Path, dirty: bool) {
        self.with_repo(path, |repo| repo.dirty = dirty).unwrap();
    }

    pub(crate) fn has_branch(&self, path: &Path, name: &str) -> bool {
        self.repos
            .lock()
            .unwrap()
            .get(path)
            .is_some_and(|r| r.branches.contains_key(name))
    }

    pub(crate) fn resets(&self, path: &Path) -> Vec<String> {
        self.repos
            .lock()
            .unwrap()
            .get(path)
            .map(|r| r.resets.clone())
            .unwrap_or_default()
    }

    pub(crate) fn fail_resets(&self, fail: bool) {
        *self.fail_resets.lock().unwrap() = fail;
    }

    fn with_repo<T>(&self, path: &Path, f: impl FnOnce(&mut FakeRepo) -> T) -> Result<T> {
        let mut repos = self.repos.lock().unwrap();
        let repo = repos
            .get_mut(path)
            .ok_or_else(|| VcsError::RepositoryNotFound {
                path: path.display().to_string(),
            })?;
        Ok(f(repo))
    }
}

impl GitBackend for FakeBackend {
    fn is_repository(&self, path: &Path) -> bool {
        self.repos.lock().unwrap().contains_key(path)
    }

    fn status(&self, path: &Path) -> Result<RepositoryStatus> {
        self.with_repo(path, |repo| {
            let changes = usize::from(repo.dirty);
            RepositoryStatus::new(repo.current_branch.clone(), path.display().to_string())
                .with_counts(changes, 0, 0, false)
                .with_head(repo.head.clone())
        })
    }

    fn head_hash(&self, path: &Path) -> Result<Option<String>> {
        self.with_repo(path, |repo| repo.head.clone())
    }

    fn list_refs(&self, path: &Path) -> Result<Vec<String>> {
        self.with_repo(path, |repo| {
            let mut refs: Vec<String> = repo.branches.keys().cloned().collect();
            refs.push("main".to_string());
            refs
        })
    }

    fn reset_to_ref(&self, path: &Path, reference: &str, _mode: ResetMode) -> Result<()> {
        if *self.fail_resets.lock().unwrap() {
            return Err(VcsError::invalid_state("simulated reset failure"));
        }
        self.with_repo(path, |repo| {
            repo.head = Some(reference.to_string());
            repo.resets.push(reference.to_string());
        })
    }

    fn restore_from_backup(&self, path: &Path, branch: &str, backup_ref: &str) -> Result<()> {
        if *self.fail_resets.lock().unwrap() {
            return Err(VcsError::invalid_state("simulated restore failure"));
        }
        self.with_repo(path, |repo| {
            if repo.current_branch != branch {
                return Err(VcsError::BranchMismatch {
                    expected: branch.to_string(),
                    found: repo.current_branch.clone(),
                });
            }
            let target = repo
                .branches
                .get(backup_ref)
                .cloned()
                .ok_or_else(|| VcsError::ref_not_found(backup_ref))?;
            repo.head = Some(target.clone());
            repo.resets.push(target);
            Ok(())
        })?
    }

    fn create_branch(&self, path: &Path, name: &str) -> Result<String> {
        self.with_repo(path, |repo| {
            let head = repo.head.clone().unwrap_or_default();
            repo.branches.insert(name.to_string(), head.clone());
            head
        })
    }

    fn delete_branch(&self, path: &Path, name: &str) -> Result<()> {
        self.with_repo(path, |repo| {
            repo.branches
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| VcsError::ref_not_found(name))
        })?
    }
}

/// A completed commit record run in `dir`
pub(crate) fn sample_record(dir: &Path) -> OperationRecord {
    OperationRecord {
        id: format!("{}-test", Utc::now().timestamp_nanos_opt().unwrap_or_default()),
        timestamp: Utc::now(),
        command: "commit".to_string(),
        args: Vec::new(),
        description: "test commit".to_string(),
        status: OperationStatus::Completed,
        undoable: true,
        metadata: OperationMetadata {
            working_directory: dir.to_path_buf(),
            user: "tester".to_string(),
            platform: "test".to_string(),
            version: "0.0.0".to_string(),
        },
        result: Value::Null,
        undo_data: UndoData::Commit(CommitUndo::new("abc123", "def456")),
        backup_info: None,
        duration_ms: None,
        undone_at: None,
        undo_result: None,
    }
}
