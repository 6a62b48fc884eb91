//! Operation records and their undo payloads

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::HistoryError;

/// Kind of mutating action a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// A single custom-dated commit
    Commit,
    /// A history migration that rewrote existing commits
    Migrate,
    /// A run of commits created together
    Batch,
    /// A configuration edit
    Config,
}

impl OperationType {
    /// All operation types
    pub const ALL: [OperationType; 4] = [
        OperationType::Commit,
        OperationType::Migrate,
        OperationType::Batch,
        OperationType::Config,
    ];

    /// Wire name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Commit => "commit",
            OperationType::Migrate => "migrate",
            OperationType::Batch => "batch",
            OperationType::Config => "config",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "commit" => Ok(OperationType::Commit),
            "migrate" => Ok(OperationType::Migrate),
            "batch" => Ok(OperationType::Batch),
            "config" => Ok(OperationType::Config),
            other => Err(HistoryError::config(format!(
                "unknown operation type '{}'",
                other
            ))),
        }
    }
}

/// Lifecycle of a record; `Undone` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// The action ran and has not been reversed
    Completed,
    /// The action has been reversed
    Undone,
}

impl OperationStatus {
    /// Wire name of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Completed => "completed",
            OperationStatus::Undone => "undone",
        }
    }
}

/// A commit created by an operation, with the commit it was built on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitUndo {
    /// Hash of the created commit
    pub commit_hash: String,
    /// Hash HEAD pointed at before the commit
    pub parent_hash: String,
}

impl CommitUndo {
    /// Create a new commit payload
    pub fn new(commit_hash: impl Into<String>, parent_hash: impl Into<String>) -> Self {
        Self {
            commit_hash: commit_hash.into(),
            parent_hash: parent_hash.into(),
        }
    }
}

/// Undo payload for a history migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateUndo {
    /// Branch the migration rewrote
    pub branch: String,
    /// HEAD before the migration
    #[serde(default)]
    pub original_head: Option<String>,
}

/// Undo payload for a batch of commits, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUndo {
    /// Commits in creation order
    pub commits: Vec<CommitUndo>,
}

/// Undo payload for a configuration edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUndo {
    /// Dotted configuration key
    pub key: String,
    /// Value before the edit; `null` when the key did not exist
    #[serde(default)]
    pub previous_value: Option<Value>,
}

/// Type-specific data needed to reverse an operation
///
/// Serialized without a tag: the record's `type` field says which variant
/// `undoData` holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UndoData {
    /// Reverse a single commit
    Commit(CommitUndo),
    /// Reverse a history migration
    Migrate(MigrateUndo),
    /// Reverse a batch of commits
    Batch(BatchUndo),
    /// Reverse a configuration edit
    Config(ConfigUndo),
}

impl UndoData {
    /// Operation type this payload belongs to
    pub fn operation_type(&self) -> OperationType {
        match self {
            UndoData::Commit(_) => OperationType::Commit,
            UndoData::Migrate(_) => OperationType::Migrate,
            UndoData::Batch(_) => OperationType::Batch,
            UndoData::Config(_) => OperationType::Config,
        }
    }

    /// Parse a raw payload for the given type
    pub fn from_value(kind: OperationType, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            OperationType::Commit => UndoData::Commit(serde_json::from_value(value)?),
            OperationType::Migrate => UndoData::Migrate(serde_json::from_value(value)?),
            OperationType::Batch => UndoData::Batch(serde_json::from_value(value)?),
            OperationType::Config => UndoData::Config(serde_json::from_value(value)?),
        })
    }
}

/// Environment captured when the operation was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    /// Directory the action ran in
    pub working_directory: PathBuf,
    /// User that ran the action
    pub user: String,
    /// `os-arch` of the machine
    pub platform: String,
    /// chronogit version that recorded the operation
    #[serde(default)]
    pub version: String,
}

/// Reference to a backup taken before a risky rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    /// Backup branch name
    pub branch: String,
    /// Manifest file in the backup directory, if one was written
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    /// Commit the backup branch points at
    #[serde(default)]
    pub head: Option<String>,
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
}

impl BackupInfo {
    /// Backup that only consists of a branch
    pub fn branch(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            manifest: None,
            head: None,
            created_at: Utc::now(),
        }
    }
}

/// A persisted entry describing one mutating action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RecordWire")]
pub struct OperationRecord {
    /// Unique id (timestamp + random suffix)
    pub id: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Command that performed the action
    pub command: String,
    /// Arguments the command was invoked with
    pub args: Vec<String>,
    /// Human-readable description
    pub description: String,
    /// Lifecycle status
    pub status: OperationStatus,
    /// Whether undo is permitted at all
    pub undoable: bool,
    /// Environment at record time
    pub metadata: OperationMetadata,
    /// Outcome of the original action
    pub result: Value,
    /// Payload needed to reverse the action
    pub undo_data: UndoData,
    /// Backup taken before the action, if any
    pub backup_info: Option<BackupInfo>,
    /// Duration of the original action in milliseconds
    pub duration_ms: Option<u64>,
    /// When the record was undone
    pub undone_at: Option<DateTime<Utc>>,
    /// What the undo changed
    pub undo_result: Option<Value>,
}

impl OperationRecord {
    /// Operation type, derived from the undo payload
    pub fn kind(&self) -> OperationType {
        self.undo_data.operation_type()
    }

    /// Whether the record has been undone
    pub fn is_undone(&self) -> bool {
        self.status == OperationStatus::Undone
    }

    /// Whether an undo may be attempted
    pub fn can_undo(&self) -> bool {
        self.undoable && self.status == OperationStatus::Completed
    }

    /// Transition `completed → undone`
    pub fn mark_undone(&mut self, undo_result: Value) -> Result<(), HistoryError> {
        if self.is_undone() {
            return Err(HistoryError::AlreadyUndone(self.id.clone()));
        }

        self.status = OperationStatus::Undone;
        self.undone_at = Some(Utc::now());
        self.undo_result = Some(undo_result);
        Ok(())
    }
}

/// On-disk shape of a record, with `undoData` still untyped
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordWire {
    id: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: OperationType,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    description: String,
    status: OperationStatus,
    undoable: bool,
    metadata: OperationMetadata,
    #[serde(default)]
    result: Value,
    undo_data: Value,
    #[serde(default)]
    backup_info: Option<BackupInfo>,
    #[serde(default)]
    duration: Option<u64>,
    #[serde(default)]
    undone_at: Option<DateTime<Utc>>,
    #[serde(default)]
    undo_result: Option<Value>,
}

impl TryFrom<RecordWire> for OperationRecord {
    type Error = serde_json::Error;

    fn try_from(wire: RecordWire) -> Result<Self, Self::Error> {
        let undo_data = UndoData::from_value(wire.kind, wire.undo_data)?;
        Ok(OperationRecord {
            id: wire.id,
            timestamp: wire.timestamp,
            command: wire.command,
            args: wire.args,
            description: wire.description,
            status: wire.status,
            undoable: wire.undoable,
            metadata: wire.metadata,
            result: wire.result,
            undo_data,
            backup_info: wire.backup_info,
            duration_ms: wire.duration,
            undone_at: wire.undone_at,
            undo_result: wire.undo_result,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordRef<'a> {
    id: &'a str,
    timestamp: &'a DateTime<Utc>,
    #[serde(rename = "type")]
    kind: OperationType,
    command: &'a str,
    args: &'a [String],
    description: &'a str,
    status: OperationStatus,
    undoable: bool,
    metadata: &'a OperationMetadata,
    result: &'a Value,
    undo_data: &'a UndoData,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_info: Option<&'a BackupInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    undone_at: Option<&'a DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    undo_result: Option<&'a Value>,
}

impl Serialize for OperationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RecordRef {
            id: &self.id,
            timestamp: &self.timestamp,
            kind: self.kind(),
            command: &self.command,
            args: &self.args,
            description: &self.description,
            status: self.status,
            undoable: self.undoable,
            metadata: &self.metadata,
            result: &self.result,
            undo_data: &self.undo_data,
            backup_info: self.backup_info.as_ref(),
            duration: self.duration_ms,
            undone_at: self.undone_at.as_ref(),
            undo_result: self.undo_result.as_ref(),
        }
        .serialize(serializer)
    }
}

/// Input to the recorder: an action that has just succeeded
#[derive(Debug, Clone)]
pub struct NewOperation {
    /// Command that performed the action
    pub command: String,
    /// Arguments the command was invoked with
    pub args: Vec<String>,
    /// Human-readable description
    pub description: String,
    /// Whether undo is permitted
    pub undoable: bool,
    /// Outcome of the action
    pub result: Value,
    /// Payload needed to reverse the action
    pub undo_data: UndoData,
    /// Backup taken before the action
    pub backup_info: Option<BackupInfo>,
    /// Directory the action ran in; defaults to the current directory
    pub working_directory: Option<PathBuf>,
    /// Duration of the action in milliseconds
    pub duration_ms: Option<u64>,
}

impl NewOperation {
    /// Describe an undoable operation
    pub fn new(command: impl Into<String>, undo_data: UndoData) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            description: String::new(),
            undoable: true,
            result: Value::Null,
            undo_data,
            backup_info: None,
            working_directory: None,
            duration_ms: None,
        }
    }

    /// Set the command arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the action's result
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    /// Attach a backup reference
    pub fn with_backup(mut self, backup: BackupInfo) -> Self {
        self.backup_info = Some(backup);
        self
    }

    /// Set the directory the action ran in
    pub fn in_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set the action duration
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Mark the operation as not undoable
    pub fn not_undoable(mut self) -> Self {
        self.undoable = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record(undo_data: UndoData) -> OperationRecord {
        OperationRecord {
            id: "1760880000000-a1b2c3d4".to_string(),
            timestamp: Utc::now(),
            command: "commit".to_string(),
            args: vec!["--date".to_string(), "2024-01-01".to_string()],
            description: "Backdated commit".to_string(),
            status: OperationStatus::Completed,
            undoable: true,
            metadata: OperationMetadata {
                working_directory: PathBuf::from("/tmp/repo"),
                user: "dev".to_string(),
                platform: "linux-x86_64".to_string(),
                version: "0.1.0".to_string(),
            },
            result: json!({"commitHash": "abc123"}),
            undo_data,
            backup_info: None,
            duration_ms: Some(42),
            undone_at: None,
            undo_result: None,
        }
    }

    #[test]
    fn test_record_wire_format() {
        let record = sample_record(UndoData::Commit(CommitUndo::new("abc123", "def456")));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "commit");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["undoData"]["commitHash"], "abc123");
        assert_eq!(value["undoData"]["parentHash"], "def456");
        assert_eq!(value["metadata"]["workingDirectory"], "/tmp/repo");
        assert_eq!(value["duration"], 42);
        assert!(value.get("undoneAt").is_none());
        assert!(value.get("backupInfo").is_none());
    }

    #[test]
    fn test_record_parses_by_type_tag() {
        let record = sample_record(UndoData::Config(ConfigUndo {
            key: "git.defaultTime".to_string(),
            previous_value: None,
        }));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"previousValue\":null"));

        let parsed: OperationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind(), OperationType::Config);
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_mismatched_undo_data_is_rejected() {
        let mut value =
            serde_json::to_value(sample_record(UndoData::Commit(CommitUndo::new("a", "b"))))
                .unwrap();
        value["type"] = json!("batch");

        let parsed: Result<OperationRecord, _> = serde_json::from_value(value);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_mark_undone_is_one_way() {
        let mut record = sample_record(UndoData::Commit(CommitUndo::new("abc123", "def456")));
        assert!(record.can_undo());

        record.mark_undone(json!({"action": "resetTo"})).unwrap();
        assert!(record.is_undone());
        assert!(record.undone_at.is_some());
        assert!(!record.can_undo());

        let again = record.mark_undone(json!({}));
        assert!(matches!(again, Err(HistoryError::AlreadyUndone(_))));
    }

    #[test]
    fn test_operation_type_parsing() {
        assert_eq!("commit".parse::<OperationType>().unwrap(), OperationType::Commit);
        assert_eq!("MIGRATE".parse::<OperationType>().unwrap(), OperationType::Migrate);
        assert!("rebase".parse::<OperationType>().is_err());
        assert_eq!(OperationType::Batch.to_string(), "batch");
    }

    #[test]
    fn test_new_operation_builder() {
        let op = NewOperation::new(
            "config set",
            UndoData::Config(ConfigUndo {
                key: "k".to_string(),
                previous_value: Some(json!("v")),
            }),
        )
        .with_args(["k", "w"])
        .with_description("Set k")
        .with_duration_ms(5)
        .not_undoable();

        assert_eq!(op.args, vec!["k".to_string(), "w".to_string()]);
        assert!(!op.undoable);
        assert_eq!(op.duration_ms, Some(5));
    }
}
