//! Git repository implementation

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use git2::{BranchType, ErrorCode, Repository as Git2Repository, Status, StatusOptions};
use tracing::{debug, trace};

use crate::{
    error::{Result, VcsError},
    repository::{RepositoryMutation, RepositoryQuery},
    status::{CommitInfo, RepositoryStatus},
    types::{Branch, ResetMode},
};

/// Git repository implementation
pub struct GitRepository {
    /// The underlying git2 repository
    repo: Git2Repository,
    /// Repository root path
    root_path: PathBuf,
}

impl GitRepository {
    /// Open a Git repository at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening Git repository at: {}", path.display());

        let repo = Git2Repository::open(path).map_err(|e| {
            debug!("Failed to open repository: {}", e);
            VcsError::RepositoryNotFound {
                path: path.display().to_string(),
            }
        })?;

        Self::from_git2(repo)
    }

    /// Discover a Git repository starting from the given path
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Discovering Git repository from: {}", path.display());

        let repo = Git2Repository::discover(path).map_err(|e| {
            debug!("Failed to discover repository: {}", e);
            VcsError::RepositoryNotFound {
                path: path.display().to_string(),
            }
        })?;

        Self::from_git2(repo)
    }

    fn from_git2(repo: Git2Repository) -> Result<Self> {
        let root_path = repo
            .workdir()
            .ok_or_else(|| VcsError::invalid_state("Repository has no working directory"))?
            .to_path_buf();

        trace!("Repository root: {}", root_path.display());
        Ok(Self { repo, root_path })
    }

    /// Check if a directory is inside a Git repository
    pub fn is_git_repository<P: AsRef<Path>>(path: P) -> bool {
        Git2Repository::discover(path).is_ok()
    }

    /// Resolve a revspec (hash, branch, tag) to a commit
    fn resolve_commit(&self, reference: &str) -> Result<git2::Commit<'_>> {
        let object = self.repo.revparse_single(reference).map_err(|e| {
            if e.code() == ErrorCode::NotFound || e.code() == ErrorCode::InvalidSpec {
                VcsError::ref_not_found(reference)
            } else {
                VcsError::Git(e)
            }
        })?;

        object
            .peel_to_commit()
            .map_err(|_| VcsError::ref_not_found(reference))
    }

    /// Name of the checked-out branch, `HEAD` when detached or unborn
    pub fn current_ref_name(&self) -> String {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().unwrap_or("HEAD").to_string(),
            _ => "HEAD".to_string(),
        }
    }

    /// Get the last commit information
    fn get_last_commit(&self) -> Result<Option<CommitInfo>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(_) => {
                debug!("No HEAD found, repository might be empty");
                return Ok(None);
            }
        };

        let commit = head.peel_to_commit()?;
        let hash = commit.id().to_string();

        let message = commit
            .message()
            .unwrap_or("No commit message")
            .lines()
            .next()
            .unwrap_or("No commit message")
            .to_string();

        let author = commit.author();
        let author_name = author.name().unwrap_or("Unknown").to_string();

        let timestamp = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Some(CommitInfo::new(
            &hash[..7],
            message,
            author_name,
            timestamp,
        )))
    }

    /// Get file status entries, untracked included
    fn get_file_statuses(&self) -> Result<Vec<(PathBuf, Status)>> {
        let mut status_options = StatusOptions::new();
        status_options.include_untracked(true);
        status_options.include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut status_options))?;
        let files: Vec<_> = statuses
            .iter()
            .filter_map(|entry| entry.path().map(|p| (PathBuf::from(p), entry.status())))
            .collect();

        trace!("Found {} files with status changes", files.len());
        Ok(files)
    }
}

impl RepositoryQuery for GitRepository {
    fn get_status(&self) -> Result<RepositoryStatus> {
        debug!("Getting repository status");

        let file_statuses = self.get_file_statuses()?;

        let mut uncommitted = 0;
        let mut untracked = 0;
        let mut staged = 0;
        let mut has_conflicts = false;

        for (_, status) in &file_statuses {
            if status.contains(Status::CONFLICTED) {
                has_conflicts = true;
            }

            if status.intersects(
                Status::INDEX_MODIFIED
                    | Status::INDEX_NEW
                    | Status::INDEX_DELETED
                    | Status::INDEX_RENAMED
                    | Status::INDEX_TYPECHANGE,
            ) {
                staged += 1;
            }

            if status.intersects(
                Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_RENAMED | Status::WT_TYPECHANGE,
            ) {
                uncommitted += 1;
            }

            if status.contains(Status::WT_NEW) {
                untracked += 1;
            }
        }

        let mut repo_status =
            RepositoryStatus::new(self.current_ref_name(), self.root_path.display().to_string())
                .with_counts(uncommitted, untracked, staged, has_conflicts)
                .with_head(self.head_hash()?);

        if let Ok(Some(last_commit)) = self.get_last_commit() {
            repo_status = repo_status.with_last_commit(last_commit);
        }

        debug!(
            "Repository status: {} uncommitted, {} untracked, {} staged, conflicts: {}",
            uncommitted, untracked, staged, has_conflicts
        );

        Ok(repo_status)
    }

    fn head_hash(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string())),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_branches(&self) -> Result<Vec<Branch>> {
        debug!("Getting local branches");

        let mut branches = Vec::new();
        for branch_result in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch_result?;
            let Some(name) = branch.name()? else {
                continue;
            };

            let mut branch_obj = Branch::new(name);
            if branch.is_head() {
                branch_obj = branch_obj.current();
            }

            if let Ok(commit) = branch.get().peel_to_commit() {
                let timestamp = Utc
                    .timestamp_opt(commit.time().seconds(), 0)
                    .single()
                    .unwrap_or_else(Utc::now);
                branch_obj = branch_obj.with_target(commit.id().to_string(), timestamp);
            }

            branches.push(branch_obj);
        }

        debug!("Found {} branches", branches.len());
        Ok(branches)
    }

    fn get_root_path(&self) -> Result<String> {
        Ok(self.root_path.display().to_string())
    }
}

impl RepositoryMutation for GitRepository {
    fn reset_to(&self, reference: &str, mode: ResetMode) -> Result<()> {
        debug!("Resetting {} to {} ({:?})", self.current_ref_name(), reference, mode);

        let commit = self.resolve_commit(reference)?;
        self.repo.reset(commit.as_object(), mode.into(), None)?;

        debug!("HEAD now at {}", commit.id());
        Ok(())
    }

    fn create_branch(&self, name: &str) -> Result<String> {
        if !git2::Branch::name_is_valid(name)? {
            return Err(VcsError::InvalidBranch {
                name: name.to_string(),
            });
        }

        let head = self.repo.head()?.peel_to_commit()?;
        self.repo.branch(name, &head, false)?;

        debug!("Created branch {} at {}", name, head.id());
        Ok(head.id().to_string())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|e| {
                if e.code() == ErrorCode::NotFound {
                    VcsError::ref_not_found(name)
                } else {
                    VcsError::Git(e)
                }
            })?;
        branch.delete()?;

        debug!("Deleted branch {}", name);
        Ok(())
    }
}
