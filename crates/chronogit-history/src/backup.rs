//! Backup creation, cleanup and retention
//!
//! A backup is a branch pointing at HEAD before a risky rewrite, plus a JSON
//! manifest in the backup directory so expired backups can be found without
//! the history that referenced them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chronogit_vcs::{GitBackend, VcsError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::HistoryResult;
use crate::models::{BackupInfo, OperationRecord};

/// Prefix of every backup branch
pub const BACKUP_BRANCH_PREFIX: &str = "chronogit-backup/";

/// Manifest describing one backup artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    /// Backup branch name
    pub branch: String,
    /// Repository the branch lives in
    pub repository: PathBuf,
    /// Commit the branch points at
    pub head: String,
    /// Label given at creation
    pub label: String,
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
}

/// Creates, retains and removes backup artifacts
pub struct BackupCoordinator {
    backup_dir: PathBuf,
    backend: Arc<dyn GitBackend>,
}

impl BackupCoordinator {
    /// Create a coordinator storing manifests under `backup_dir`
    pub fn new(backup_dir: impl Into<PathBuf>, backend: Arc<dyn GitBackend>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            backend,
        }
    }

    /// Directory holding backup manifests
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Branch HEAD of `workdir` and write a manifest for it
    pub async fn create_backup(&self, workdir: &Path, label: &str) -> HistoryResult<BackupInfo> {
        let created_at = Utc::now();
        let branch = format!(
            "{}{}-{}",
            BACKUP_BRANCH_PREFIX,
            sanitize_label(label),
            created_at.format("%Y%m%d%H%M%S%3f")
        );

        let head = self.backend.create_branch(workdir, &branch)?;

        let manifest = BackupManifest {
            branch: branch.clone(),
            repository: workdir.to_path_buf(),
            head: head.clone(),
            label: label.to_string(),
            created_at,
        };

        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let manifest_path = self.manifest_path(&branch);
        let content = serde_json::to_string_pretty(&manifest)?;
        tokio::fs::write(&manifest_path, content).await?;

        info!("Created backup {} at {}", branch, head);
        Ok(BackupInfo {
            branch,
            manifest: Some(manifest_path),
            head: Some(head),
            created_at,
        })
    }

    /// Remove the backup a record references, if any
    ///
    /// Best-effort: failures are logged and never returned.
    pub async fn cleanup(&self, record: &OperationRecord) {
        let Some(backup) = &record.backup_info else {
            return;
        };

        debug!("Cleaning up backup {} of {}", backup.branch, record.id);
        self.remove_branch(&record.metadata.working_directory, &backup.branch);

        let manifest = backup
            .manifest
            .clone()
            .unwrap_or_else(|| self.manifest_path(&backup.branch));
        remove_file_quietly(&manifest).await;
    }

    /// Remove backups older than `max_age_days`, whatever references them
    ///
    /// Returns how many backups were removed. Never fails.
    pub async fn sweep_expired(&self, max_age_days: u32) -> usize {
        let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));

        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!("Cannot read backup directory {}: {}", self.backup_dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Backup sweep stopped early: {}", e);
                    break;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match read_manifest(&path).await {
                Some(manifest) if manifest.created_at < cutoff => {
                    self.remove_branch(&manifest.repository, &manifest.branch);
                    remove_file_quietly(&path).await;
                    removed += 1;
                }
                Some(_) => {}
                None => {
                    // Unreadable manifest: fall back to the file's age
                    if modified_before(&path, cutoff).await {
                        remove_file_quietly(&path).await;
                        removed += 1;
                    }
                }
            }
        }

        if removed > 0 {
            info!("Swept {} expired backup(s)", removed);
        }
        removed
    }

    /// All readable manifests, newest first
    pub async fn list_backups(&self) -> HistoryResult<Vec<BackupManifest>> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut manifests = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(manifest) = read_manifest(&entry.path()).await {
                manifests.push(manifest);
            }
        }

        manifests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(manifests)
    }

    fn manifest_path(&self, branch: &str) -> PathBuf {
        self.backup_dir
            .join(format!("{}.json", branch.replace('/', "_")))
    }

    fn remove_branch(&self, repository: &Path, branch: &str) {
        if !repository.is_dir() {
            debug!(
                "Repository {} is gone, skipping branch {}",
                repository.display(),
                branch
            );
            return;
        }

        match self.backend.delete_branch(repository, branch) {
            Ok(()) => debug!("Deleted backup branch {}", branch),
            Err(VcsError::RefNotFound { .. }) => debug!("Backup branch {} already gone", branch),
            Err(e) => warn!("Failed to delete backup branch {}: {}", branch, e),
        }
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "backup".to_string()
    } else {
        cleaned
    }
}

async fn read_manifest(path: &Path) -> Option<BackupManifest> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&content).ok()
}

async fn modified_before(path: &Path, cutoff: DateTime<Utc>) -> bool {
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified) < cutoff,
        Err(_) => false,
    }
}

async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_record, FakeBackend};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_backup_writes_branch_and_manifest() {
        let data = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.add_repo(repo.path(), "abc123");

        let coordinator = BackupCoordinator::new(data.path().join("backups"), backend.clone());
        let info = coordinator
            .create_backup(repo.path(), "migrate dates")
            .await
            .unwrap();

        assert!(info.branch.starts_with("chronogit-backup/migrate-dates-"));
        assert_eq!(info.head.as_deref(), Some("abc123"));
        assert!(info.manifest.as_ref().unwrap().exists());
        assert!(backend.has_branch(repo.path(), &info.branch));

        let listed = coordinator.list_backups().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].branch, info.branch);
    }

    #[tokio::test]
    async fn test_cleanup_removes_branch_and_manifest() {
        let data = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.add_repo(repo.path(), "abc123");

        let coordinator = BackupCoordinator::new(data.path().join("backups"), backend.clone());
        let info = coordinator.create_backup(repo.path(), "migrate").await.unwrap();

        let mut record = sample_record(repo.path());
        record.backup_info = Some(info.clone());
        coordinator.cleanup(&record).await;

        assert!(!backend.has_branch(repo.path(), &info.branch));
        assert!(!info.manifest.unwrap().exists());

        // A second cleanup finds nothing and does not panic
        coordinator.cleanup(&record).await;
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_repository() {
        let data = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let coordinator = BackupCoordinator::new(data.path().join("backups"), backend);

        let mut record = sample_record(Path::new("/definitely/not/here"));
        record.backup_info = Some(BackupInfo::branch("chronogit-backup/gone"));
        coordinator.cleanup(&record).await;
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_backups() {
        let data = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.add_repo(repo.path(), "abc123");

        let backup_dir = data.path().join("backups");
        let coordinator = BackupCoordinator::new(&backup_dir, backend.clone());
        let fresh = coordinator.create_backup(repo.path(), "fresh").await.unwrap();

        backend
            .create_branch(repo.path(), "chronogit-backup/old")
            .unwrap();
        let old = BackupManifest {
            branch: "chronogit-backup/old".to_string(),
            repository: repo.path().to_path_buf(),
            head: "abc123".to_string(),
            label: "old".to_string(),
            created_at: Utc::now() - Duration::days(45),
        };
        let old_path = backup_dir.join("chronogit-backup_old.json");
        std::fs::write(&old_path, serde_json::to_string(&old).unwrap()).unwrap();

        let removed = coordinator.sweep_expired(30).await;

        assert_eq!(removed, 1);
        assert!(!old_path.exists());
        assert!(!backend.has_branch(repo.path(), "chronogit-backup/old"));
        assert!(backend.has_branch(repo.path(), &fresh.branch));
    }

    #[tokio::test]
    async fn test_sweep_without_backup_dir_is_noop() {
        let data = TempDir::new().unwrap();
        let coordinator =
            BackupCoordinator::new(data.path().join("missing"), Arc::new(FakeBackend::new()));
        assert_eq!(coordinator.sweep_expired(1).await, 0);
        assert!(coordinator.list_backups().await.unwrap().is_empty());
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("migrate dates"), "migrate-dates");
        assert_eq!(sanitize_label("a/b:c"), "a-b-c");
        assert_eq!(sanitize_label(""), "backup");
    }
}
