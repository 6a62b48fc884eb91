//! Per-type reversal strategies

use std::path::Path;
use std::sync::Arc;

use chronogit_vcs::{GitBackend, ResetMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config_store::ConfigStore;
use crate::error::{HistoryError, HistoryResult};
use crate::models::{
    BatchUndo, CommitUndo, ConfigUndo, MigrateUndo, OperationRecord, UndoData,
};

/// What a successful reversal changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UndoOutcome {
    /// Branch hard-reset from one commit to another
    ResetTo {
        from: Option<String>,
        to: String,
    },
    /// Branch restored from a backup branch
    Restored {
        backup: String,
        from: Option<String>,
        to: Option<String>,
    },
    /// A batch of commits discarded by one reset
    BatchReset {
        commits: usize,
        from: Option<String>,
        to: String,
    },
    /// Configuration key put back to its previous value
    ConfigRestored { key: String, value: Value },
    /// Configuration key that did not exist before was removed
    ConfigRemoved { key: String },
}

/// Applies the reversal a record describes
pub struct UndoExecutor {
    backend: Arc<dyn GitBackend>,
    config: Arc<dyn ConfigStore>,
}

impl UndoExecutor {
    /// Create an executor using the given collaborators
    pub fn new(backend: Arc<dyn GitBackend>, config: Arc<dyn ConfigStore>) -> Self {
        Self { backend, config }
    }

    /// Reverse `record`; any failure is an `ExecutionFailure`
    pub async fn execute(&self, record: &OperationRecord) -> HistoryResult<UndoOutcome> {
        let dir = record.metadata.working_directory.as_path();
        debug!("Executing {} undo for {}", record.kind(), record.id);

        let outcome = match &record.undo_data {
            UndoData::Commit(commit) => self.undo_commit(dir, commit),
            UndoData::Migrate(migrate) => self.undo_migrate(record, migrate),
            UndoData::Batch(batch) => self.undo_batch(dir, batch),
            UndoData::Config(config) => self.undo_config(config).await,
        }
        .map_err(|e| match e {
            HistoryError::ExecutionFailure { .. } => e,
            other => HistoryError::execution_failure(&record.id, other.to_string()),
        })?;

        info!("Undid {} ({})", record.id, record.kind());
        Ok(outcome)
    }

    fn undo_commit(&self, dir: &Path, commit: &CommitUndo) -> HistoryResult<UndoOutcome> {
        let from = self.backend.head_hash(dir)?;
        self.backend
            .reset_to_ref(dir, &commit.parent_hash, ResetMode::Hard)?;
        Ok(UndoOutcome::ResetTo {
            from,
            to: commit.parent_hash.clone(),
        })
    }

    fn undo_migrate(
        &self,
        record: &OperationRecord,
        migrate: &MigrateUndo,
    ) -> HistoryResult<UndoOutcome> {
        let Some(backup) = &record.backup_info else {
            return Err(HistoryError::execution_failure(
                &record.id,
                "migration has no backup to restore from",
            ));
        };

        let dir = record.metadata.working_directory.as_path();
        let from = self.backend.head_hash(dir)?;
        self.backend
            .restore_from_backup(dir, &migrate.branch, &backup.branch)?;
        let to = self.backend.head_hash(dir)?;

        Ok(UndoOutcome::Restored {
            backup: backup.branch.clone(),
            from,
            to,
        })
    }

    fn undo_batch(&self, dir: &Path, batch: &BatchUndo) -> HistoryResult<UndoOutcome> {
        let first = batch
            .commits
            .first()
            .ok_or_else(|| HistoryError::storage("batch contains no commits"))?;

        let from = self.backend.head_hash(dir)?;
        self.backend
            .reset_to_ref(dir, &first.parent_hash, ResetMode::Hard)?;

        Ok(UndoOutcome::BatchReset {
            commits: batch.commits.len(),
            from,
            to: first.parent_hash.clone(),
        })
    }

    async fn undo_config(&self, config: &ConfigUndo) -> HistoryResult<UndoOutcome> {
        match &config.previous_value {
            Some(value) => {
                self.config.set(&config.key, value.clone()).await?;
                Ok(UndoOutcome::ConfigRestored {
                    key: config.key.clone(),
                    value: value.clone(),
                })
            }
            None => {
                self.config.remove(&config.key).await?;
                Ok(UndoOutcome::ConfigRemoved {
                    key: config.key.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::MemoryConfigStore;
    use crate::models::BackupInfo;
    use crate::test_support::{sample_record, FakeBackend};
    use serde_json::json;
    use tempfile::TempDir;

    fn setup(head: &str) -> (TempDir, Arc<FakeBackend>, Arc<MemoryConfigStore>, UndoExecutor) {
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.add_repo(repo.path(), head);
        let config = Arc::new(MemoryConfigStore::new());
        let executor = UndoExecutor::new(backend.clone(), config.clone());
        (repo, backend, config, executor)
    }

    #[tokio::test]
    async fn test_commit_resets_to_parent() {
        let (repo, backend, _config, executor) = setup("abc123");
        let outcome = executor.execute(&sample_record(repo.path())).await.unwrap();

        assert_eq!(
            outcome,
            UndoOutcome::ResetTo {
                from: Some("abc123".to_string()),
                to: "def456".to_string(),
            }
        );
        assert_eq!(backend.head(repo.path()).as_deref(), Some("def456"));
    }

    #[tokio::test]
    async fn test_migrate_restores_backup() {
        let (repo, backend, _config, executor) = setup("old111");
        backend
            .create_branch(repo.path(), "chronogit-backup/migrate")
            .unwrap();
        backend.set_head(repo.path(), "new222");

        let mut record = sample_record(repo.path());
        record.undo_data = UndoData::Migrate(MigrateUndo {
            branch: "main".to_string(),
            original_head: Some("old111".to_string()),
        });
        record.backup_info = Some(BackupInfo::branch("chronogit-backup/migrate"));

        let outcome = executor.execute(&record).await.unwrap();
        assert_eq!(
            outcome,
            UndoOutcome::Restored {
                backup: "chronogit-backup/migrate".to_string(),
                from: Some("new222".to_string()),
                to: Some("old111".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_migrate_leaves_other_branch_alone() {
        let (repo, backend, _config, executor) = setup("old111");
        backend
            .create_branch(repo.path(), "chronogit-backup/migrate")
            .unwrap();
        backend.checkout(repo.path(), "feature");
        backend.set_head(repo.path(), "feat333");

        let mut record = sample_record(repo.path());
        record.undo_data = UndoData::Migrate(MigrateUndo {
            branch: "main".to_string(),
            original_head: Some("old111".to_string()),
        });
        record.backup_info = Some(BackupInfo::branch("chronogit-backup/migrate"));

        let result = executor.execute(&record).await;
        match result {
            Err(HistoryError::ExecutionFailure { message, .. }) => {
                assert!(message.contains("feature"));
            }
            other => panic!("expected ExecutionFailure, got {:?}", other),
        }
        assert_eq!(backend.head(repo.path()).as_deref(), Some("feat333"));
        assert!(backend.resets(repo.path()).is_empty());
    }

    #[tokio::test]
    async fn test_migrate_without_backup_fails() {
        let (repo, _backend, _config, executor) = setup("abc123");
        let mut record = sample_record(repo.path());
        record.undo_data = UndoData::Migrate(MigrateUndo {
            branch: "main".to_string(),
            original_head: None,
        });

        let result = executor.execute(&record).await;
        assert!(matches!(result, Err(HistoryError::ExecutionFailure { .. })));
    }

    #[tokio::test]
    async fn test_batch_resets_before_first_commit() {
        let (repo, backend, _config, executor) = setup("ccc333");
        let mut record = sample_record(repo.path());
        record.undo_data = UndoData::Batch(BatchUndo {
            commits: vec![
                CommitUndo::new("aaa111", "base000"),
                CommitUndo::new("bbb222", "aaa111"),
                CommitUndo::new("ccc333", "bbb222"),
            ],
        });

        let outcome = executor.execute(&record).await.unwrap();
        assert_eq!(
            outcome,
            UndoOutcome::BatchReset {
                commits: 3,
                from: Some("ccc333".to_string()),
                to: "base000".to_string(),
            }
        );
        assert_eq!(backend.resets(repo.path()), vec!["base000"]);
    }

    #[tokio::test]
    async fn test_config_null_previous_value_removes_key() {
        let (repo, _backend, config, executor) = setup("abc123");
        config.set("git.defaultTime", json!("09:00")).await.unwrap();

        let mut record = sample_record(repo.path());
        record.undo_data = UndoData::Config(ConfigUndo {
            key: "git.defaultTime".to_string(),
            previous_value: None,
        });

        let outcome = executor.execute(&record).await.unwrap();
        assert_eq!(
            outcome,
            UndoOutcome::ConfigRemoved {
                key: "git.defaultTime".to_string()
            }
        );
        assert_eq!(config.get("git.defaultTime").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_config_previous_value_is_restored() {
        let (repo, _backend, config, executor) = setup("abc123");
        config.set("git.defaultTime", json!("17:00")).await.unwrap();

        let mut record = sample_record(repo.path());
        record.undo_data = UndoData::Config(ConfigUndo {
            key: "git.defaultTime".to_string(),
            previous_value: Some(json!("09:00")),
        });

        executor.execute(&record).await.unwrap();
        assert_eq!(
            config.get("git.defaultTime").await.unwrap(),
            Some(json!("09:00"))
        );
    }

    #[tokio::test]
    async fn test_backend_failure_is_execution_failure() {
        let (repo, backend, _config, executor) = setup("abc123");
        backend.fail_resets(true);

        let record = sample_record(repo.path());
        match executor.execute(&record).await {
            Err(HistoryError::ExecutionFailure { id, message }) => {
                assert_eq!(id, record.id);
                assert!(message.contains("simulated reset failure"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_outcome_serializes_with_action_tag() {
        let value = serde_json::to_value(UndoOutcome::ConfigRemoved {
            key: "k".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({"action": "configRemoved", "key": "k"}));
    }
}
