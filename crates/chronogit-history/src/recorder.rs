//! Appending records for actions that have just succeeded

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{HistoryError, HistoryResult};
use crate::models::{NewOperation, OperationMetadata, OperationRecord, OperationStatus};
use crate::store::HistoryStore;

const MAX_ID_ATTEMPTS: usize = 5;

/// Builds records and appends them to the store
pub struct OperationRecorder {
    store: Arc<HistoryStore>,
}

impl OperationRecorder {
    /// Create a recorder writing to `store`
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    /// Record a completed action and return the new record's id
    pub async fn record(&self, op: NewOperation) -> HistoryResult<String> {
        let metadata = capture_metadata(op.working_directory.clone())?;
        let kind = op.undo_data.operation_type();

        let mut last_id = String::new();
        for _ in 0..MAX_ID_ATTEMPTS {
            let now = Utc::now();
            let id = generate_id(now);
            let record = OperationRecord {
                id: id.clone(),
                timestamp: now,
                command: op.command.clone(),
                args: op.args.clone(),
                description: op.description.clone(),
                status: OperationStatus::Completed,
                undoable: op.undoable,
                metadata: metadata.clone(),
                result: op.result.clone(),
                undo_data: op.undo_data.clone(),
                backup_info: op.backup_info.clone(),
                duration_ms: op.duration_ms,
                undone_at: None,
                undo_result: None,
            };

            match self.store.insert(record).await {
                Ok(_) => {
                    info!("Recorded {} operation {}", kind, id);
                    return Ok(id);
                }
                Err(HistoryError::DuplicateId(_)) => {
                    debug!("Id {} already taken, regenerating", id);
                    last_id = id;
                }
                Err(e) => return Err(e),
            }
        }

        Err(HistoryError::DuplicateId(last_id))
    }
}

/// `<millis>-<8 hex chars>`
pub fn generate_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &suffix[..8])
}

fn capture_metadata(working_directory: Option<PathBuf>) -> HistoryResult<OperationMetadata> {
    let working_directory = match working_directory {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => absolute_from(&std::env::current_dir()?, &dir),
        None => std::env::current_dir()?,
    };

    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    Ok(OperationMetadata {
        working_directory,
        user,
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Resolve a relative `dir` against `base` without touching the filesystem
fn absolute_from(base: &Path, dir: &Path) -> PathBuf {
    let mut resolved = base.to_path_buf();
    for component in dir.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}
