//! History command - inspect, export and clear recorded operations

use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chronogit_history::{
    ClearOptions, ExportFormat, HistoryFilter, OperationRecord, OperationType,
};

use crate::commands::{is_stdout, Command, Workspace};
use crate::error::{CliError, CliResult};
use crate::output::{self, OutputStyle};

/// History command action
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryAction {
    /// List records
    List(HistoryFilter),
    /// Show one record in full
    Show { id: String },
    /// Remove records
    Clear(ClearOptions),
    /// Export records
    Export {
        format: ExportFormat,
        output: Option<PathBuf>,
    },
    /// Totals by type and status
    Stats,
}

/// History command handler
pub struct HistoryCommand {
    action: HistoryAction,
    workspace: Workspace,
}

impl HistoryCommand {
    /// Create a new history command
    pub fn new(action: HistoryAction, workspace: Workspace) -> Self {
        Self { action, workspace }
    }
}

#[async_trait::async_trait]
impl Command for HistoryCommand {
    async fn execute(&self) -> CliResult<()> {
        let history = self.workspace.open().await?;
        let style = OutputStyle::default();

        match &self.action {
            HistoryAction::List(filter) => {
                let records = history.query(filter).await?;
                list_records(&style, &records);
            }
            HistoryAction::Show { id } => {
                let record = history.get(id).await?;
                show_record(&style, &record)?;
                if record.can_undo() {
                    let safety = history.check_undo_safety(id).await?;
                    println!();
                    println!("{}", style.header("Undo safety"));
                    for check in &safety.checks {
                        println!("  {}", style.safety_check(check));
                    }
                }
            }
            HistoryAction::Clear(options) => {
                let removed = history.clear(options).await?;
                if removed.is_empty() {
                    output::print_info("No matching operations to clear");
                } else {
                    output::print_success(&format!(
                        "Cleared {} operation(s){}",
                        removed.len(),
                        if options.keep_backups {
                            " (backups kept)"
                        } else {
                            ""
                        }
                    ));
                }
            }
            HistoryAction::Export {
                format,
                output: destination,
            } => {
                let rendered = history.export(&HistoryFilter::new(), *format).await?;
                match destination {
                    Some(path) if !is_stdout(path) => {
                        tokio::fs::write(path, rendered).await?;
                        output::print_success(&format!(
                            "Exported history as {} to {}",
                            format,
                            path.display()
                        ));
                    }
                    _ => print!("{}", rendered),
                }
            }
            HistoryAction::Stats => {
                let stats = history.stats().await?;
                println!("{}", style.header("Operation history"));
                println!("{}", style.key_value("Total", &stats.total.to_string()));
                println!("{}", style.key_value("Completed", &stats.completed.to_string()));
                println!("{}", style.key_value("Undone", &stats.undone.to_string()));
                println!("{}", style.key_value("Undoable", &stats.undoable.to_string()));
                println!("{}", style.key_value("With backup", &stats.with_backup.to_string()));
                println!();
                println!("{}", style.header("By type"));
                for (kind, count) in &stats.by_type {
                    println!("{}", style.key_value(kind.as_str(), &count.to_string()));
                }
            }
        }

        Ok(())
    }
}

fn list_records(style: &OutputStyle, records: &[OperationRecord]) {
    if records.is_empty() {
        println!("No operations recorded.");
        return;
    }

    for record in records {
        println!("{}", style.record_line(record));
    }
}

fn show_record(style: &OutputStyle, record: &OperationRecord) -> CliResult<()> {
    println!("{}", style.header(&format!("Operation {}", record.id)));
    println!("{}", style.key_value("Type", record.kind().as_str()));
    println!("{}", style.key_value("Status", record.status.as_str()));
    println!("{}", style.key_value("Undoable", &record.undoable.to_string()));
    println!("{}", style.key_value("Recorded", &record.timestamp.to_rfc3339()));
    let invocation = format!("{} {}", record.command, record.args.join(" "));
    println!("{}", style.key_value("Command", invocation.trim_end()));
    if !record.description.is_empty() {
        println!("{}", style.key_value("Description", &record.description));
    }
    println!(
        "{}",
        style.key_value(
            "Directory",
            &record.metadata.working_directory.display().to_string()
        )
    );
    println!(
        "{}",
        style.key_value(
            "Recorded by",
            &format!(
                "{} on {} (chronogit {})",
                record.metadata.user, record.metadata.platform, record.metadata.version
            )
        )
    );
    if let Some(duration) = record.duration_ms {
        println!("{}", style.key_value("Duration", &format!("{} ms", duration)));
    }
    if let Some(backup) = &record.backup_info {
        println!("{}", style.key_value("Backup", &backup.branch));
    }
    if let Some(undone_at) = record.undone_at {
        println!("{}", style.key_value("Undone", &undone_at.to_rfc3339()));
    }

    let undo_data = serde_json::to_string_pretty(&record.undo_data)
        .map_err(|e| CliError::Internal(e.to_string()))?;
    println!("{}", style.key_value("Undo data", &undo_data));
    Ok(())
}

/// Build a list filter from raw flag values
pub fn build_filter(
    kind: Option<&str>,
    undoable: bool,
    since: Option<&str>,
    until: Option<&str>,
    limit: Option<usize>,
) -> CliResult<HistoryFilter> {
    let mut filter = HistoryFilter::new();
    if let Some(kind) = kind {
        filter = filter.kind(parse_kind(kind)?);
    }
    if undoable {
        filter = filter.undoable_only();
    }
    if let Some(since) = since {
        filter = filter.since(parse_date(since, false)?);
    }
    if let Some(until) = until {
        filter = filter.until(parse_date(until, true)?);
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }
    Ok(filter)
}

/// Build clear options from raw flag values
pub fn build_clear_options(
    older_than_days: Option<u32>,
    kind: Option<&str>,
    keep_backups: bool,
) -> CliResult<ClearOptions> {
    Ok(ClearOptions {
        older_than: older_than_days.map(|days| Utc::now() - Duration::days(i64::from(days))),
        kind: kind.map(parse_kind).transpose()?,
        keep_backups,
    })
}

pub fn parse_kind(value: &str) -> CliResult<OperationType> {
    value.parse().map_err(|_| {
        CliError::invalid_argument(format!(
            "unknown operation type '{}' (expected commit, migrate, batch or config)",
            value
        ))
    })
}

/// RFC 3339 timestamp or `YYYY-MM-DD`
///
/// A bare date means the start of that day, or its end when `end_of_day`.
pub fn parse_date(value: &str, end_of_day: bool) -> CliResult<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        CliError::invalid_argument(format!(
            "invalid date '{}' (expected YYYY-MM-DD or RFC 3339)",
            value
        ))
    })?;

    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| CliError::Internal("invalid time of day".to_string()))?;

    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}
