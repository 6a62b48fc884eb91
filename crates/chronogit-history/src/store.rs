//! Persistent, bounded history of operation records
//!
//! The whole list lives in one JSON array, newest first. Every mutation
//! rewrites the file (temp file + rename). There is no locking between
//! processes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::backup::BackupCoordinator;
use crate::error::{HistoryError, HistoryResult};
use crate::models::{OperationRecord, OperationType};

/// Criteria for listing records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Only records of this type
    pub kind: Option<OperationType>,
    /// Only records created at or after this time
    pub since: Option<DateTime<Utc>>,
    /// Only records created at or before this time
    pub until: Option<DateTime<Utc>>,
    /// Only records that can still be undone
    pub undoable_only: bool,
    /// Maximum number of records returned
    pub limit: Option<usize>,
}

impl HistoryFilter {
    /// Match every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one operation type
    pub fn kind(mut self, kind: OperationType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to records created at or after `since`
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Restrict to records created at or before `until`
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Restrict to records that are undoable and not yet undone
    pub fn undoable_only(mut self) -> Self {
        self.undoable_only = true;
        self
    }

    /// Return at most `limit` records
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record passes every criterion except the limit
    pub fn matches(&self, record: &OperationRecord) -> bool {
        if self.kind.is_some_and(|kind| record.kind() != kind) {
            return false;
        }
        if self.since.is_some_and(|since| record.timestamp < since) {
            return false;
        }
        if self.until.is_some_and(|until| record.timestamp > until) {
            return false;
        }
        !self.undoable_only || record.can_undo()
    }
}

/// Criteria for clearing records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearOptions {
    /// Only records created before this time
    pub older_than: Option<DateTime<Utc>>,
    /// Only records of this type
    pub kind: Option<OperationType>,
    /// Leave referenced backups in place
    pub keep_backups: bool,
}

impl ClearOptions {
    fn matches(&self, record: &OperationRecord) -> bool {
        self.older_than.map_or(true, |cutoff| record.timestamp < cutoff)
            && self.kind.map_or(true, |kind| record.kind() == kind)
    }
}

/// File-backed list of operation records
pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
    backups: Arc<BackupCoordinator>,
}

impl HistoryStore {
    /// Create a store persisting to `path`, keeping at most `max_entries`
    pub fn new(
        path: impl Into<PathBuf>,
        max_entries: usize,
        backups: Arc<BackupCoordinator>,
    ) -> Self {
        Self {
            path: path.into(),
            max_entries: max_entries.max(1),
            backups,
        }
    }

    /// Path of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maximum number of records kept
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Load every record, newest first; a missing file is an empty history
    pub async fn load(&self) -> HistoryResult<Vec<OperationRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            HistoryError::storage(format!(
                "history file {} is corrupt: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Replace the persisted list
    pub async fn save(&self, records: &[OperationRecord]) -> HistoryResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(records)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!("Saved {} record(s) to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Records matching `filter`, newest first
    pub async fn query(&self, filter: &HistoryFilter) -> HistoryResult<Vec<OperationRecord>> {
        let mut records: Vec<OperationRecord> = self
            .load()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// A single record by id
    pub async fn get(&self, id: &str) -> HistoryResult<OperationRecord> {
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    /// Prepend a record, evicting the oldest beyond the maximum
    ///
    /// Backups referenced by evicted records are cleaned up. Returns the
    /// evicted records.
    pub async fn insert(&self, record: OperationRecord) -> HistoryResult<Vec<OperationRecord>> {
        let mut records = self.load().await?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(HistoryError::DuplicateId(record.id));
        }

        records.insert(0, record);

        let evicted = if records.len() > self.max_entries {
            records.split_off(self.max_entries)
        } else {
            Vec::new()
        };

        self.save(&records).await?;

        for old in &evicted {
            debug!("Evicted {} from history", old.id);
            self.backups.cleanup(old).await;
        }
        if !evicted.is_empty() {
            info!("Evicted {} record(s) beyond the limit of {}", evicted.len(), self.max_entries);
        }

        Ok(evicted)
    }

    /// Replace the stored record that has the same id
    pub async fn update(&self, record: &OperationRecord) -> HistoryResult<()> {
        let mut records = self.load().await?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| HistoryError::NotFound(record.id.clone()))?;
        *slot = record.clone();
        self.save(&records).await
    }

    /// Remove matching records, returning them
    ///
    /// Referenced backups are cleaned up unless `keep_backups` is set.
    pub async fn clear(&self, options: &ClearOptions) -> HistoryResult<Vec<OperationRecord>> {
        let records = self.load().await?;
        let (removed, kept): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| options.matches(r));

        if removed.is_empty() {
            return Ok(removed);
        }

        self.save(&kept).await?;

        if !options.keep_backups {
            for record in &removed {
                self.backups.cleanup(record).await;
            }
        }

        info!("Cleared {} record(s) from history", removed.len());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigUndo, UndoData};
    use crate::test_support::{sample_record, FakeBackend};
    use chrono::Duration;
    use chronogit_vcs::GitBackend;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, max_entries: usize, backend: Arc<FakeBackend>) -> HistoryStore {
        let backups = Arc::new(BackupCoordinator::new(dir.path().join("backups"), backend));
        HistoryStore::new(dir.path().join("history.json"), max_entries, backups)
    }

    fn record_at(dir: &Path, id: &str, minutes_ago: i64) -> OperationRecord {
        let mut record = sample_record(dir);
        record.id = id.to_string();
        record.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 10, Arc::new(FakeBackend::new()));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 10, Arc::new(FakeBackend::new()));
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load().await, Err(HistoryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_insert_keeps_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 10, Arc::new(FakeBackend::new()));

        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            store
                .insert(record_at(dir.path(), id, 10 - i as i64))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store.load().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 10, Arc::new(FakeBackend::new()));
        store.insert(record_at(dir.path(), "same", 1)).await.unwrap();

        let result = store.insert(record_at(dir.path(), "same", 0)).await;
        assert!(matches!(result, Err(HistoryError::DuplicateId(_))));
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_eviction_cleans_up_backups() {
        let dir = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.add_repo(repo.path(), "abc123");
        let store = store_in(&dir, 2, backend.clone());

        let mut oldest = record_at(repo.path(), "oldest", 3);
        backend
            .create_branch(repo.path(), "chronogit-backup/oldest")
            .unwrap();
        oldest.backup_info = Some(crate::models::BackupInfo::branch("chronogit-backup/oldest"));

        store.insert(oldest).await.unwrap();
        store.insert(record_at(repo.path(), "middle", 2)).await.unwrap();
        let evicted = store.insert(record_at(repo.path(), "newest", 1)).await.unwrap();

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "oldest");
        assert!(!backend.has_branch(repo.path(), "chronogit-backup/oldest"));

        let ids: Vec<String> = store.load().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["newest", "middle"]);
    }

    #[tokio::test]
    async fn test_query_filters_and_limits() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 10, Arc::new(FakeBackend::new()));

        let mut config = record_at(dir.path(), "cfg", 30);
        config.undo_data = UndoData::Config(ConfigUndo {
            key: "git.defaultTime".to_string(),
            previous_value: None,
        });
        let mut undone = record_at(dir.path(), "undone", 20);
        undone.mark_undone(serde_json::Value::Null).unwrap();
        let mut fixed = record_at(dir.path(), "fixed", 10);
        fixed.undoable = false;

        store.insert(config).await.unwrap();
        store.insert(undone).await.unwrap();
        store.insert(fixed).await.unwrap();
        store.insert(record_at(dir.path(), "latest", 0)).await.unwrap();

        let configs = store
            .query(&HistoryFilter::new().kind(OperationType::Config))
            .await
            .unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].id, "cfg");

        let undoable = store
            .query(&HistoryFilter::new().undoable_only())
            .await
            .unwrap();
        let ids: Vec<&str> = undoable.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["latest", "cfg"]);

        let recent = store
            .query(&HistoryFilter::new().since(Utc::now() - Duration::minutes(15)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);

        let older = store
            .query(&HistoryFilter::new().until(Utc::now() - Duration::minutes(15)))
            .await
            .unwrap();
        assert_eq!(older.len(), 2);

        let limited = store.query(&HistoryFilter::new().limit(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "latest");
    }

    #[tokio::test]
    async fn test_get_and_update() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 10, Arc::new(FakeBackend::new()));
        store.insert(record_at(dir.path(), "one", 0)).await.unwrap();

        let mut record = store.get("one").await.unwrap();
        record.mark_undone(serde_json::json!({"ok": true})).unwrap();
        store.update(&record).await.unwrap();

        assert!(store.get("one").await.unwrap().is_undone());
        assert!(matches!(
            store.get("missing").await,
            Err(HistoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_by_age_and_type() {
        let dir = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.add_repo(repo.path(), "abc123");
        let store = store_in(&dir, 10, backend.clone());

        let mut old = record_at(repo.path(), "old", 60 * 24 * 10);
        backend
            .create_branch(repo.path(), "chronogit-backup/old")
            .unwrap();
        old.backup_info = Some(crate::models::BackupInfo::branch("chronogit-backup/old"));
        store.insert(old).await.unwrap();
        store.insert(record_at(repo.path(), "new", 0)).await.unwrap();

        let removed = store
            .clear(&ClearOptions {
                older_than: Some(Utc::now() - Duration::days(1)),
                ..ClearOptions::default()
            })
            .await
            .unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "old");
        assert!(!backend.has_branch(repo.path(), "chronogit-backup/old"));

        let removed = store
            .clear(&ClearOptions {
                kind: Some(OperationType::Config),
                ..ClearOptions::default()
            })
            .await
            .unwrap();
        assert!(removed.is_empty());
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_keep_backups() {
        let dir = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.add_repo(repo.path(), "abc123");
        let store = store_in(&dir, 10, backend.clone());

        let mut record = record_at(repo.path(), "kept-backup", 0);
        backend
            .create_branch(repo.path(), "chronogit-backup/keep")
            .unwrap();
        record.backup_info = Some(crate::models::BackupInfo::branch("chronogit-backup/keep"));
        store.insert(record).await.unwrap();

        let removed = store
            .clear(&ClearOptions {
                keep_backups: true,
                ..ClearOptions::default()
            })
            .await
            .unwrap();

        assert_eq!(removed.len(), 1);
        assert!(store.load().await.unwrap().is_empty());
        assert!(backend.has_branch(repo.path(), "chronogit-backup/keep"));
    }
}
