//! Repository traits
//!
//! Split the way callers use them:
//! - `RepositoryQuery`: read-only state queries
//! - `RepositoryMutation`: operations that move refs or rewrite the working tree

use crate::{
    error::Result,
    status::RepositoryStatus,
    types::{Branch, ResetMode},
};

/// Read-only repository state queries
///
/// # Examples
///
/// ```ignore
/// use chronogit_vcs::{GitRepository, RepositoryQuery};
///
/// let repo = GitRepository::discover(".")?;
/// let status = repo.get_status()?;
/// println!("{} at {:?}, clean: {}", status.current_ref, status.head, status.is_clean);
/// ```
pub trait RepositoryQuery {
    /// Get the current repository status
    fn get_status(&self) -> Result<RepositoryStatus>;

    /// Full hash of HEAD, `None` when the branch is unborn
    fn head_hash(&self) -> Result<Option<String>>;

    /// Get all local branches
    fn get_branches(&self) -> Result<Vec<Branch>>;

    /// Check if the repository is clean (no uncommitted changes)
    fn is_clean(&self) -> Result<bool> {
        Ok(self.get_status()?.is_clean)
    }

    /// Get the repository root path
    fn get_root_path(&self) -> Result<String>;
}

/// Operations that move refs or rewrite the working tree
pub trait RepositoryMutation {
    /// Reset the current branch to `reference` (any revspec resolving to a commit)
    fn reset_to(&self, reference: &str, mode: ResetMode) -> Result<()>;

    /// Create a local branch at HEAD, returning the commit hash it points at
    fn create_branch(&self, name: &str) -> Result<String>;

    /// Delete a local branch
    fn delete_branch(&self, name: &str) -> Result<()>;
}
