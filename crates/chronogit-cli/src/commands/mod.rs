// Command handlers for the chronogit CLI

pub mod history;
pub mod undo;

pub use history::{HistoryAction, HistoryCommand};
pub use undo::{UndoCommand, UndoTarget};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chronogit_history::{HistoryConfig, OperationHistory};
use chronogit_vcs::Git2Backend;
use tracing::debug;

use crate::error::CliResult;
use crate::yaml_store::YamlConfigStore;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command
    async fn execute(&self) -> CliResult<()>;
}

/// Where the history, backups and YAML config live
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    /// Overrides the configured data directory
    pub data_dir: Option<PathBuf>,
}

impl Workspace {
    /// Use `data_dir` instead of the configured locations
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
        }
    }

    /// History configuration with the data directory override applied
    pub fn history_config(&self) -> CliResult<HistoryConfig> {
        let mut config = HistoryConfig::load()?;
        if let Some(dir) = &self.data_dir {
            config.history_file = dir.join("history.json");
            config.backup_dir = dir.join("backups");
        }
        Ok(config)
    }

    /// YAML file holding chronogit's own settings
    pub fn config_file(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(HistoryConfig::default_data_dir)
            .join("config.yaml")
    }

    /// Open the operation history with the git2 backend
    pub async fn open(&self) -> CliResult<OperationHistory> {
        let config = self.history_config()?;
        debug!("Using history file {}", config.history_file.display());

        let history = OperationHistory::open(
            &config,
            Arc::new(Git2Backend::new()),
            Arc::new(YamlConfigStore::new(self.config_file())),
        )
        .await?;
        Ok(history)
    }
}

/// Whether `path` names stdout
pub(crate) fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}
