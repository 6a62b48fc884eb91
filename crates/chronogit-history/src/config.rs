//! History configuration
//!
//! Layered the usual way: built-in defaults, then an optional TOML file
//! (`~/.config/chronogit/history.toml`), then `CHRONOGIT_*` environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HistoryError, HistoryResult};

/// Default maximum number of records kept
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default backup retention window
pub const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 30;

/// Configuration for the operation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of records kept; the oldest are evicted first
    pub max_entries: usize,
    /// JSON file holding the history, newest first
    pub history_file: PathBuf,
    /// Directory holding backup manifests
    pub backup_dir: PathBuf,
    /// Backups older than this are swept
    pub backup_retention_days: u32,
    /// Sweep expired backups when the history is opened
    pub sweep_on_open: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::in_dir(Self::default_data_dir())
    }
}

impl HistoryConfig {
    /// Configuration with all state under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            history_file: dir.join("history.json"),
            backup_dir: dir.join("backups"),
            backup_retention_days: DEFAULT_BACKUP_RETENTION_DAYS,
            sweep_on_open: true,
        }
    }

    /// Set the maximum number of records
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the backup retention window
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.backup_retention_days = days;
        self
    }

    /// `~/.chronogit`
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chronogit")
    }

    /// `~/.config/chronogit/history.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chronogit")
            .join("history.toml")
    }

    /// Load from the default config file and the environment
    pub fn load() -> HistoryResult<Self> {
        Self::load_from(Self::default_config_path())
    }

    /// Load from `path` (optional) and the environment
    pub fn load_from(path: impl AsRef<Path>) -> HistoryResult<Self> {
        let path = path.as_ref();
        debug!("Loading history config from {}", path.display());

        let settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("CHRONOGIT").try_parsing(true))
            .build()?;

        let config: HistoryConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> HistoryResult<()> {
        if self.max_entries == 0 {
            return Err(HistoryError::config("max_entries must be greater than 0"));
        }
        if self.history_file.as_os_str().is_empty() {
            return Err(HistoryError::config("history_file cannot be empty"));
        }
        Ok(())
    }
}
