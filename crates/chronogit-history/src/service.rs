//! The operation history facade
//!
//! `OperationHistory` composes the store, recorder, safety checker, executor
//! and backup coordinator. Construct one per invocation and pass it by
//! reference.

use std::collections::BTreeMap;
use std::sync::Arc;

use chronogit_vcs::GitBackend;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backup::BackupCoordinator;
use crate::config::HistoryConfig;
use crate::config_store::ConfigStore;
use crate::error::{HistoryError, HistoryResult};
use crate::executor::{UndoExecutor, UndoOutcome};
use crate::export::{export_records, ExportFormat};
use crate::models::{NewOperation, OperationRecord, OperationStatus, OperationType};
use crate::recorder::OperationRecorder;
use crate::safety::{SafetyChecker, SafetyReport};
use crate::store::{ClearOptions, HistoryFilter, HistoryStore};

/// How an undo should be carried out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndoOptions {
    /// Skip the safety gate
    pub force: bool,
    /// Report what would happen without changing anything
    pub dry_run: bool,
}

impl UndoOptions {
    /// Force the undo past failed safety checks
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Preview only
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Result of undoing (or previewing) one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoReport {
    /// The record, as stored after the undo
    pub record: OperationRecord,
    /// Safety report; absent when forced outside a dry run
    pub safety: Option<SafetyReport>,
    /// What changed; absent for dry runs
    pub outcome: Option<UndoOutcome>,
    /// Whether this was a preview
    pub dry_run: bool,
}

/// A record `undo_last` could not undo
#[derive(Debug)]
pub struct UndoFailure {
    /// Record id
    pub id: String,
    /// Why it failed
    pub error: HistoryError,
}

/// Result of `undo_last`
#[derive(Debug, Default)]
pub struct UndoLastReport {
    /// Number of records asked for
    pub requested: usize,
    /// Number of undoable records found
    pub selected: usize,
    /// Records undone (or previewed), newest first
    pub succeeded: Vec<UndoReport>,
    /// Records that failed, in the order attempted
    pub failures: Vec<UndoFailure>,
}

impl UndoLastReport {
    /// Whether processing stopped before every selected record was attempted
    pub fn stopped_early(&self) -> bool {
        self.succeeded.len() + self.failures.len() < self.selected
    }

    /// Whether every selected record was undone
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.stopped_early()
    }
}

/// Totals over the whole history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    /// Records in the history
    pub total: usize,
    /// Record count per operation type
    pub by_type: BTreeMap<OperationType, usize>,
    /// Records still in effect
    pub completed: usize,
    /// Records already reversed
    pub undone: usize,
    /// Completed records that can still be undone
    pub undoable: usize,
    /// Records referencing a backup
    pub with_backup: usize,
}

/// Records mutating actions and reverses them on request
pub struct OperationHistory {
    store: Arc<HistoryStore>,
    recorder: OperationRecorder,
    safety: SafetyChecker,
    executor: UndoExecutor,
    backups: Arc<BackupCoordinator>,
}

impl OperationHistory {
    /// Assemble the history from its collaborators
    pub fn new(
        config: &HistoryConfig,
        backend: Arc<dyn GitBackend>,
        config_store: Arc<dyn ConfigStore>,
    ) -> Self {
        let backups = Arc::new(BackupCoordinator::new(
            config.backup_dir.clone(),
            backend.clone(),
        ));
        let store = Arc::new(HistoryStore::new(
            config.history_file.clone(),
            config.max_entries,
            backups.clone(),
        ));

        Self {
            recorder: OperationRecorder::new(store.clone()),
            safety: SafetyChecker::new(backend.clone()),
            executor: UndoExecutor::new(backend, config_store),
            store,
            backups,
        }
    }

    /// Validate `config`, assemble the history and sweep expired backups
    pub async fn open(
        config: &HistoryConfig,
        backend: Arc<dyn GitBackend>,
        config_store: Arc<dyn ConfigStore>,
    ) -> HistoryResult<Self> {
        config.validate()?;
        let history = Self::new(config, backend, config_store);

        if config.sweep_on_open {
            history
                .backups
                .sweep_expired(config.backup_retention_days)
                .await;
        }

        debug!("Opened history at {}", history.store.path().display());
        Ok(history)
    }

    /// Backup coordinator, for callers taking a backup before a rewrite
    pub fn backups(&self) -> &BackupCoordinator {
        &self.backups
    }

    /// Record an action that has just succeeded
    pub async fn record(&self, op: NewOperation) -> HistoryResult<String> {
        self.recorder.record(op).await
    }

    /// Record an action, logging instead of returning any failure
    pub async fn record_quietly(&self, op: NewOperation) -> Option<String> {
        let command = op.command.clone();
        match self.recorder.record(op).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to record '{}' in history: {}", command, e);
                None
            }
        }
    }

    /// Records matching `filter`, newest first
    pub async fn query(&self, filter: &HistoryFilter) -> HistoryResult<Vec<OperationRecord>> {
        self.store.query(filter).await
    }

    /// One record by id
    pub async fn get(&self, id: &str) -> HistoryResult<OperationRecord> {
        self.store.get(id).await
    }

    /// Remove records matching `options`
    pub async fn clear(&self, options: &ClearOptions) -> HistoryResult<Vec<OperationRecord>> {
        self.store.clear(options).await
    }

    /// Totals by type and status
    pub async fn stats(&self) -> HistoryResult<HistoryStats> {
        let records = self.store.load().await?;
        let mut stats = HistoryStats {
            total: records.len(),
            ..HistoryStats::default()
        };

        for kind in OperationType::ALL {
            stats.by_type.insert(kind, 0);
        }

        for record in &records {
            *stats.by_type.entry(record.kind()).or_default() += 1;
            match record.status {
                OperationStatus::Completed => stats.completed += 1,
                OperationStatus::Undone => stats.undone += 1,
            }
            if record.can_undo() {
                stats.undoable += 1;
            }
            if record.backup_info.is_some() {
                stats.with_backup += 1;
            }
        }

        Ok(stats)
    }

    /// Render the records matching `filter`
    pub async fn export(&self, filter: &HistoryFilter, format: ExportFormat) -> HistoryResult<String> {
        let records = self.store.query(filter).await?;
        export_records(&records, format)
    }

    /// Run the safety checks for a record without undoing it
    pub async fn check_undo_safety(&self, id: &str) -> HistoryResult<SafetyReport> {
        let record = self.store.get(id).await?;
        Ok(self.safety.check(&record))
    }

    /// Undo one record
    pub async fn undo(&self, id: &str, options: UndoOptions) -> HistoryResult<UndoReport> {
        let record = self.store.get(id).await?;
        self.undo_record(record, options).await
    }

    /// Undo the `count` most recent undoable records, newest first
    ///
    /// Stops at the first failure unless forced.
    pub async fn undo_last(&self, count: usize, options: UndoOptions) -> HistoryResult<UndoLastReport> {
        let candidates = self
            .store
            .query(&HistoryFilter::new().undoable_only().limit(count))
            .await?;

        let mut report = UndoLastReport {
            requested: count,
            selected: candidates.len(),
            ..UndoLastReport::default()
        };

        for record in candidates {
            let id = record.id.clone();
            match self.undo_record(record, options).await {
                Ok(undone) => report.succeeded.push(undone),
                Err(error) => {
                    warn!("Undo of {} failed: {}", id, error);
                    report.failures.push(UndoFailure { id, error });
                    if !options.force {
                        break;
                    }
                }
            }
        }

        info!(
            "Undo of last {}: {} succeeded, {} failed",
            count,
            report.succeeded.len(),
            report.failures.len()
        );
        Ok(report)
    }

    async fn undo_record(
        &self,
        mut record: OperationRecord,
        options: UndoOptions,
    ) -> HistoryResult<UndoReport> {
        if !record.undoable {
            return Err(HistoryError::NotUndoable(record.id));
        }
        if record.is_undone() {
            return Err(HistoryError::AlreadyUndone(record.id));
        }

        let safety = (!options.force || options.dry_run).then(|| self.safety.check(&record));

        if !options.force {
            if let Some(report) = safety.as_ref().filter(|r| !r.safe) {
                let reason = report
                    .reason
                    .clone()
                    .unwrap_or_else(|| "safety check failed".to_string());
                return Err(HistoryError::unsafe_state(record.id, reason));
            }
        }

        if options.dry_run {
            debug!("Dry run for {}", record.id);
            return Ok(UndoReport {
                record,
                safety,
                outcome: None,
                dry_run: true,
            });
        }

        let outcome = self.executor.execute(&record).await?;
        record.mark_undone(serde_json::to_value(&outcome)?)?;
        self.store.update(&record).await?;

        Ok(UndoReport {
            record,
            safety,
            outcome: Some(outcome),
            dry_run: false,
        })
    }
}
