//! chronogit VCS backend
//!
//! This crate provides the repository operations chronogit's operation history
//! relies on:
//! - Git repository discovery and status reading
//! - HEAD and branch inspection
//! - Hard resets and backup-branch restores
//! - Backup branch creation and removal
//!
//! # Examples
//!
//! ```ignore
//! use chronogit_vcs::{Git2Backend, GitBackend, ResetMode};
//! use std::path::Path;
//!
//! let backend = Git2Backend::new();
//! let repo = Path::new(".");
//! let status = backend.status(repo)?;
//! if status.is_clean {
//!     backend.reset_to_ref(repo, "HEAD~1", ResetMode::Hard)?;
//! }
//! ```

pub mod backend;
pub mod error;
pub mod git;
pub mod repository;
pub mod status;
pub mod types;

pub use backend::{Git2Backend, GitBackend};
pub use error::{Result, VcsError};
pub use git::GitRepository;
pub use repository::{RepositoryMutation, RepositoryQuery};
pub use status::{CommitInfo, RepositoryStatus};
pub use types::{Branch, ResetMode};
