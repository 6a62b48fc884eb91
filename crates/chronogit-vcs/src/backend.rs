//! Path-addressed repository backend
//!
//! Operation records only remember the directory an action ran in, so every
//! call names the repository it targets. `Git2Backend` reopens the repository
//! per call and delegates to [`GitRepository`].

use std::path::Path;

use tracing::debug;

use crate::{
    error::{Result, VcsError},
    git::GitRepository,
    repository::{RepositoryMutation, RepositoryQuery},
    status::RepositoryStatus,
    types::ResetMode,
};

/// Repository operations the history engine depends on
pub trait GitBackend: Send + Sync {
    /// Whether `path` is inside a Git repository
    fn is_repository(&self, path: &Path) -> bool;

    /// Working tree status, current ref and HEAD
    fn status(&self, path: &Path) -> Result<RepositoryStatus>;

    /// Full hash of HEAD
    fn head_hash(&self, path: &Path) -> Result<Option<String>>;

    /// Names of the local branches
    fn list_refs(&self, path: &Path) -> Result<Vec<String>>;

    /// Reset the checked-out branch to `reference`
    fn reset_to_ref(&self, path: &Path, reference: &str, mode: ResetMode) -> Result<()>;

    /// Put `branch` back where `backup_ref` points
    ///
    /// Fails with [`VcsError::BranchMismatch`] unless `branch` is checked out.
    fn restore_from_backup(&self, path: &Path, branch: &str, backup_ref: &str) -> Result<()>;

    /// Create a branch at HEAD, returning the commit hash
    fn create_branch(&self, path: &Path, name: &str) -> Result<String>;

    /// Delete a local branch
    fn delete_branch(&self, path: &Path, name: &str) -> Result<()>;

    /// Whether a local branch named `name` exists
    fn ref_exists(&self, path: &Path, name: &str) -> Result<bool> {
        Ok(self.list_refs(path)?.iter().any(|r| r == name))
    }
}

/// [`GitBackend`] backed by libgit2
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Backend;

impl Git2Backend {
    /// Create a new backend
    pub fn new() -> Self {
        Self
    }
}

impl GitBackend for Git2Backend {
    fn is_repository(&self, path: &Path) -> bool {
        GitRepository::is_git_repository(path)
    }

    fn status(&self, path: &Path) -> Result<RepositoryStatus> {
        GitRepository::discover(path)?.get_status()
    }

    fn head_hash(&self, path: &Path) -> Result<Option<String>> {
        GitRepository::discover(path)?.head_hash()
    }

    fn list_refs(&self, path: &Path) -> Result<Vec<String>> {
        let branches = GitRepository::discover(path)?.get_branches()?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    fn reset_to_ref(&self, path: &Path, reference: &str, mode: ResetMode) -> Result<()> {
        GitRepository::discover(path)?.reset_to(reference, mode)
    }

    fn restore_from_backup(&self, path: &Path, branch: &str, backup_ref: &str) -> Result<()> {
        let repo = GitRepository::discover(path)?;
        let current = repo.current_ref_name();
        if current != branch {
            return Err(VcsError::BranchMismatch {
                expected: branch.to_string(),
                found: current,
            });
        }

        debug!("Restoring {} in {} from backup {}", branch, path.display(), backup_ref);
        repo.reset_to(&format!("refs/heads/{}", backup_ref), ResetMode::Hard)
    }

    fn create_branch(&self, path: &Path, name: &str) -> Result<String> {
        GitRepository::discover(path)?.create_branch(name)
    }

    fn delete_branch(&self, path: &Path, name: &str) -> Result<()> {
        GitRepository::discover(path)?.delete_branch(name)
    }
}
