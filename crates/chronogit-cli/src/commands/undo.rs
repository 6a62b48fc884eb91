//! Undo command - reverse recorded operations

use chronogit_history::{UndoLastReport, UndoOptions, UndoReport};

use crate::commands::{Command, Workspace};
use crate::error::{CliError, CliResult};
use crate::output::{self, describe_outcome, OutputStyle};

/// Which records to undo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoTarget {
    /// A single record by id
    Id(String),
    /// The N most recent undoable records
    Last(usize),
}

/// Undo command handler
pub struct UndoCommand {
    target: UndoTarget,
    options: UndoOptions,
    workspace: Workspace,
}

impl UndoCommand {
    /// Create a new undo command
    pub fn new(target: UndoTarget, workspace: Workspace) -> Self {
        Self {
            target,
            options: UndoOptions::default(),
            workspace,
        }
    }

    /// Skip safety checks
    pub fn with_force(mut self, force: bool) -> Self {
        self.options.force = force;
        self
    }

    /// Preview without changing anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }
}

#[async_trait::async_trait]
impl Command for UndoCommand {
    async fn execute(&self) -> CliResult<()> {
        if self.target == UndoTarget::Last(0) {
            return Err(CliError::invalid_argument("--last must be at least 1"));
        }

        let history = self.workspace.open().await?;
        let style = OutputStyle::default();

        match &self.target {
            UndoTarget::Id(id) => {
                let report = history.undo(id, self.options).await?;
                print_report(&style, &report);
                Ok(())
            }
            UndoTarget::Last(count) => {
                let report = history.undo_last(*count, self.options).await?;
                print_last_report(&style, &report);
                if report.failures.is_empty() {
                    Ok(())
                } else {
                    Err(CliError::PartialUndo {
                        failed: report.failures.len(),
                        selected: report.selected,
                    })
                }
            }
        }
    }
}

fn print_report(style: &OutputStyle, report: &UndoReport) {
    let record = &report.record;

    if report.dry_run {
        println!(
            "{}",
            style.header(&format!(
                "Dry run: {} ({}) {}",
                record.id,
                record.kind(),
                record.description
            ))
        );
        if let Some(safety) = &report.safety {
            for check in &safety.checks {
                println!("  {}", style.safety_check(check));
            }
            if !safety.safe {
                println!(
                    "  {}",
                    style.warning("safety checks failed; --force would proceed anyway")
                );
            }
        }
        output::print_info("No changes were made");
        return;
    }

    if report.safety.is_none() {
        output::print_warning(&format!("Safety checks skipped for {}", record.id));
    }

    match &report.outcome {
        Some(outcome) => output::print_success(&format!(
            "Undid {} ({}): {}",
            record.id,
            record.kind(),
            describe_outcome(outcome)
        )),
        None => output::print_success(&format!("Undid {}", record.id)),
    }
}

fn print_last_report(style: &OutputStyle, report: &UndoLastReport) {
    if report.selected == 0 {
        output::print_info("No undoable operations found");
        return;
    }

    if report.selected < report.requested {
        output::print_info(&format!(
            "Only {} undoable operation(s) found",
            report.selected
        ));
    }

    for undone in &report.succeeded {
        print_report(style, undone);
    }

    for failure in &report.failures {
        output::print_error(&format!("{}: {}", failure.id, failure.error));
    }

    if report.stopped_early() {
        let remaining = report.selected - report.succeeded.len() - report.failures.len();
        output::print_warning(&format!(
            "Stopped after the first failure; {} operation(s) not attempted",
            remaining
        ));
    }
}
