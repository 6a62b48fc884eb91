//! JSON and CSV rendering of history records

use std::fmt;
use std::str::FromStr;

use crate::error::{HistoryError, HistoryResult};
use crate::models::OperationRecord;

/// CSV columns, in order
pub const CSV_HEADER: [&str; 8] = [
    "id",
    "timestamp",
    "type",
    "command",
    "description",
    "status",
    "undoable",
    "duration",
];

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// One row per record
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(HistoryError::Export(format!(
                "unsupported export format '{}'",
                other
            ))),
        }
    }
}

/// Render `records` in `format`
pub fn export_records(records: &[OperationRecord], format: ExportFormat) -> HistoryResult<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        ExportFormat::Csv => to_csv(records),
    }
}

fn to_csv(records: &[OperationRecord]) -> HistoryResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(export_error)?;

    for record in records {
        let timestamp = record.timestamp.to_rfc3339();
        let duration = record
            .duration_ms
            .map(|d| d.to_string())
            .unwrap_or_default();
        writer
            .write_record([
                record.id.as_str(),
                timestamp.as_str(),
                record.kind().as_str(),
                record.command.as_str(),
                record.description.as_str(),
                record.status.as_str(),
                if record.undoable { "true" } else { "false" },
                duration.as_str(),
            ])
            .map_err(export_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| HistoryError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| HistoryError::Export(e.to_string()))
}

fn export_error(err: csv::Error) -> HistoryError {
    HistoryError::Export(err.to_string())
}
