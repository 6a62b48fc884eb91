// Command routing and dispatch

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::history::{build_clear_options, build_filter};
use crate::commands::*;
use crate::error::{CliError, CliResult};

/// chronogit - record and safely undo repository operations
#[derive(Parser, Debug)]
#[command(name = "chronogit")]
#[command(bin_name = "chronogit")]
#[command(about = "Record and safely undo chronogit repository operations")]
#[command(
    long_about = "chronogit keeps a history of every commit, migration, batch run and configuration edit it performs.\n\nAny recorded operation can be undone after safety checks confirm the repository still matches what was recorded.\n\nQuick Start:\n  • chronogit history list        Show recorded operations\n  • chronogit undo --last 1       Undo the most recent operation\n  • chronogit undo <ID> --dry-run Preview an undo"
)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimize output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Keep history, backups and config in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Undo a recorded operation
    #[command(about = "Undo a recorded operation, or the most recent ones")]
    Undo {
        /// Operation id
        #[arg(value_name = "ID", required_unless_present = "last", conflicts_with = "last")]
        id: Option<String>,

        /// Undo the N most recent undoable operations
        #[arg(long, value_name = "N")]
        last: Option<usize>,

        /// Skip safety checks
        #[arg(long)]
        force: bool,

        /// Show what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect and manage the operation history
    #[command(about = "List, show, export and clear recorded operations")]
    History {
        #[command(subcommand)]
        action: HistorySubcommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum HistorySubcommand {
    /// List recorded operations, newest first
    List {
        /// Only this operation type (commit, migrate, batch, config)
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Only operations that can still be undone
        #[arg(long)]
        undoable: bool,

        /// Only operations at or after this date
        #[arg(long, value_name = "DATE")]
        since: Option<String>,

        /// Only operations at or before this date
        #[arg(long, value_name = "DATE")]
        until: Option<String>,

        /// Maximum number of operations shown
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Show one operation in full
    Show {
        /// Operation id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Remove operations from the history
    Clear {
        /// Only operations older than this many days
        #[arg(long, value_name = "DAYS")]
        older_than_days: Option<u32>,

        /// Only this operation type
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Keep the backups the removed operations reference
        #[arg(long)]
        keep_backups: bool,
    },

    /// Export the history
    Export {
        /// Output format (json, csv)
        #[arg(long, default_value = "json")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Totals by type and status
    Stats,
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse CLI arguments and route to appropriate handler
    pub async fn route() -> CliResult<()> {
        let cli = Cli::parse();

        crate::logging::init_logging(cli.verbose, cli.quiet);

        Self::execute(&cli).await
    }

    /// Execute a parsed command line
    pub async fn execute(cli: &Cli) -> CliResult<()> {
        let workspace = Workspace {
            data_dir: cli.data_dir.clone(),
        };

        match &cli.command {
            Commands::Undo {
                id,
                last,
                force,
                dry_run,
            } => {
                let target = match (id, last) {
                    (Some(id), None) => UndoTarget::Id(id.clone()),
                    (None, Some(count)) => UndoTarget::Last(*count),
                    _ => {
                        return Err(CliError::invalid_argument(
                            "pass either an operation id or --last <N>",
                        ))
                    }
                };
                let cmd = UndoCommand::new(target, workspace)
                    .with_force(*force)
                    .with_dry_run(*dry_run);
                cmd.execute().await
            }
            Commands::History { action } => {
                let action = Self::history_action(action)?;
                let cmd = HistoryCommand::new(action, workspace);
                cmd.execute().await
            }
        }
    }

    /// Translate history flags into a typed action
    pub fn history_action(action: &HistorySubcommand) -> CliResult<HistoryAction> {
        Ok(match action {
            HistorySubcommand::List {
                kind,
                undoable,
                since,
                until,
                limit,
            } => HistoryAction::List(build_filter(
                kind.as_deref(),
                *undoable,
                since.as_deref(),
                until.as_deref(),
                *limit,
            )?),
            HistorySubcommand::Show { id } => HistoryAction::Show { id: id.clone() },
            HistorySubcommand::Clear {
                older_than_days,
                kind,
                keep_backups,
            } => HistoryAction::Clear(build_clear_options(
                *older_than_days,
                kind.as_deref(),
                *keep_backups,
            )?),
            HistorySubcommand::Export { format, output } => HistoryAction::Export {
                format: format
                    .parse()
                    .map_err(|e: chronogit_history::HistoryError| {
                        CliError::invalid_argument(e.to_string())
                    })?,
                output: output.clone(),
            },
            HistorySubcommand::Stats => HistoryAction::Stats,
        })
    }
}
