// Output formatting and styling

use chronogit_history::{
    OperationRecord, OperationStatus, SafetyCheck, UndoOutcome,
};
use colored::Colorize;

use crate::logging::VerbosityLevel;

/// Output styling configuration
pub struct OutputStyle {
    pub use_colors: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl OutputStyle {
    /// Style that never emits escape codes
    pub fn plain() -> Self {
        Self { use_colors: false }
    }

    /// Format success message
    pub fn success(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✓".green().bold(), msg)
        } else {
            format!("✓ {}", msg)
        }
    }

    /// Format error message
    pub fn error(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✗".red().bold(), msg)
        } else {
            format!("✗ {}", msg)
        }
    }

    /// Format warning message
    pub fn warning(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "⚠".yellow(), msg)
        } else {
            format!("⚠ {}", msg)
        }
    }

    /// Format info message
    pub fn info(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "ℹ".blue(), msg)
        } else {
            format!("ℹ {}", msg)
        }
    }

    /// Format header
    pub fn header(&self, title: &str) -> String {
        if self.use_colors {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format a `key: value` line
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.use_colors {
            format!("  {}: {}", key.dimmed(), value)
        } else {
            format!("  {}: {}", key, value)
        }
    }

    /// Format a record status
    pub fn status(&self, status: OperationStatus) -> String {
        let label = format!("{:<9}", status.as_str());
        if !self.use_colors {
            return label;
        }
        match status {
            OperationStatus::Completed => label.green().to_string(),
            OperationStatus::Undone => label.dimmed().to_string(),
        }
    }

    /// One line of a safety report
    pub fn safety_check(&self, check: &SafetyCheck) -> String {
        let line = format!("{}: {}", check.name, check.detail);
        if check.passed {
            self.success(&line)
        } else {
            self.error(&line)
        }
    }

    /// One line of a history listing
    pub fn record_line(&self, record: &OperationRecord) -> String {
        let marker = if record.can_undo() { "↶" } else { " " };
        format!(
            "{} {}  {}  {:<8} {}  {}",
            marker,
            record.id,
            record
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S"),
            record.kind().as_str(),
            self.status(record.status),
            record.description
        )
    }
}

/// Describe what an undo changed
pub fn describe_outcome(outcome: &UndoOutcome) -> String {
    match outcome {
        UndoOutcome::ResetTo { from, to } => {
            format!("reset {} → {}", short_or_none(from.as_deref()), short(to))
        }
        UndoOutcome::Restored { backup, from, to } => format!(
            "restored from {} ({} → {})",
            backup,
            short_or_none(from.as_deref()),
            short_or_none(to.as_deref())
        ),
        UndoOutcome::BatchReset { commits, from, to } => format!(
            "discarded {} commit(s), reset {} → {}",
            commits,
            short_or_none(from.as_deref()),
            short(to)
        ),
        UndoOutcome::ConfigRestored { key, value } => format!("restored {} = {}", key, value),
        UndoOutcome::ConfigRemoved { key } => format!("removed {}", key),
    }
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

fn short_or_none(hash: Option<&str>) -> &str {
    hash.map(short).unwrap_or("(none)")
}

pub fn print_success(msg: &str) {
    if VerbosityLevel::Normal.should_output() {
        let style = OutputStyle::default();
        println!("{}", style.success(msg));
    }
}

pub fn print_error(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.error(msg));
}

pub fn print_warning(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.warning(msg));
}

pub fn print_info(msg: &str) {
    if VerbosityLevel::Normal.should_output() {
        let style = OutputStyle::default();
        println!("{}", style.info(msg));
    }
}
