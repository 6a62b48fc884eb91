//! chronogit operation history and undo engine
//!
//! Every mutating chronogit action (custom-dated commits, history migrations,
//! batch commit runs, configuration edits) is recorded here once it has
//! succeeded. A subset can later be reversed, but only after safety checks
//! confirm the repository still looks the way the record assumed.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use chronogit_history::{
//!     CommitUndo, HistoryConfig, MemoryConfigStore, NewOperation, OperationHistory,
//!     UndoData, UndoOptions,
//! };
//! use chronogit_vcs::Git2Backend;
//!
//! let history = OperationHistory::open(
//!     &HistoryConfig::load()?,
//!     Arc::new(Git2Backend::new()),
//!     Arc::new(MemoryConfigStore::new()),
//! )
//! .await?;
//!
//! let id = history
//!     .record(NewOperation::new(
//!         "commit",
//!         UndoData::Commit(CommitUndo::new(commit_hash, parent_hash)),
//!     ))
//!     .await?;
//!
//! history.undo(&id, UndoOptions::default()).await?;
//! ```

pub mod backup;
pub mod config;
pub mod config_store;
pub mod error;
pub mod executor;
pub mod export;
pub mod models;
pub mod recorder;
pub mod safety;
pub mod service;
pub mod store;

#[cfg(test)]
mod test_support;

pub use backup::{BackupCoordinator, BackupManifest, BACKUP_BRANCH_PREFIX};
pub use config::HistoryConfig;
pub use config_store::{ConfigStore, MemoryConfigStore};
pub use error::{HistoryError, HistoryResult};
pub use executor::{UndoExecutor, UndoOutcome};
pub use export::{export_records, ExportFormat};
pub use models::{
    BackupInfo, BatchUndo, CommitUndo, ConfigUndo, MigrateUndo, NewOperation, OperationMetadata,
    OperationRecord, OperationStatus, OperationType, UndoData,
};
pub use recorder::OperationRecorder;
pub use safety::{SafetyCheck, SafetyChecker, SafetyReport};
pub use service::{
    HistoryStats, OperationHistory, UndoFailure, UndoLastReport, UndoOptions, UndoReport,
};
pub use store::{ClearOptions, HistoryFilter, HistoryStore};
