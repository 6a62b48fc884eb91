//! YAML-file configuration store with dotted keys
//!
//! `git.defaultTime` addresses `defaultTime` inside the `git` mapping.
//! Missing intermediate mappings are created on `set`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chronogit_history::{ConfigStore, HistoryError, HistoryResult};
use serde_json::Value;
use serde_yaml::{Mapping, Value as YamlValue};
use tracing::debug;

/// [`ConfigStore`] persisted as a YAML document
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    /// Create a store backed by `path`; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the YAML file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> HistoryResult<YamlValue> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(YamlValue::Mapping(Mapping::new()))
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(YamlValue::Mapping(Mapping::new()));
        }

        serde_yaml::from_str(&content).map_err(|e| {
            HistoryError::storage(format!("invalid YAML in {}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, document: &YamlValue) -> HistoryResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_yaml::to_string(document)
            .map_err(|e| HistoryError::storage(e.to_string()))?;
        tokio::fs::write(&self.path, content).await?;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for YamlConfigStore {
    async fn get(&self, key: &str) -> HistoryResult<Option<Value>> {
        let document = self.load().await?;
        let mut current = &document;
        for part in split_key(key)? {
            match current.get(part) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }

        let value =
            serde_json::to_value(current).map_err(|e| HistoryError::storage(e.to_string()))?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: Value) -> HistoryResult<()> {
        let parts = split_key(key)?;
        let mut document = self.load().await?;
        let value =
            serde_yaml::to_value(value).map_err(|e| HistoryError::storage(e.to_string()))?;

        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| HistoryError::config("empty configuration key"))?;

        let mut current = &mut document;
        for part in parents {
            current = as_mapping(current)?
                .entry(YamlValue::String(part.to_string()))
                .or_insert_with(|| YamlValue::Mapping(Mapping::new()));
        }
        as_mapping(current)?.insert(YamlValue::String(last.to_string()), value);

        self.save(&document).await
    }

    async fn remove(&self, key: &str) -> HistoryResult<bool> {
        let parts = split_key(key)?;
        let mut document = self.load().await?;

        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| HistoryError::config("empty configuration key"))?;

        let mut current = &mut document;
        for part in parents {
            match current.get_mut(*part) {
                Some(next) => current = next,
                None => return Ok(false),
            }
        }

        let removed = match current.as_mapping_mut() {
            Some(map) => map.remove(*last).is_some(),
            None => false,
        };

        if removed {
            self.save(&document).await?;
        }
        Ok(removed)
    }
}

fn split_key(key: &str) -> HistoryResult<Vec<&str>> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(HistoryError::config(format!(
            "invalid configuration key '{}'",
            key
        )));
    }
    Ok(parts)
}

/// The mapping at `value`, replacing any scalar in the way
fn as_mapping(value: &mut YamlValue) -> HistoryResult<&mut Mapping> {
    if !value.is_mapping() {
        *value = YamlValue::Mapping(Mapping::new());
    }
    value
        .as_mapping_mut()
        .ok_or_else(|| HistoryError::storage("configuration document is not a mapping"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_creates_nested_keys() {
        let dir = TempDir::new().unwrap();
        let store = YamlConfigStore::new(dir.path().join("config.yaml"));

        store.set("git.defaultTime", json!("09:00")).await.unwrap();
        store.set("git.signCommits", json!(true)).await.unwrap();

        assert_eq!(
            store.get("git.defaultTime").await.unwrap(),
            Some(json!("09:00"))
        );
        assert_eq!(
            store.get("git").await.unwrap(),
            Some(json!({"defaultTime": "09:00", "signCommits": true}))
        );

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("defaultTime"));
    }

    #[tokio::test]
    async fn test_missing_file_and_key() {
        let dir = TempDir::new().unwrap();
        let store = YamlConfigStore::new(dir.path().join("absent.yaml"));

        assert_eq!(store.get("git.defaultTime").await.unwrap(), None);
        assert!(!store.remove("git.defaultTime").await.unwrap());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_remove_leaves_siblings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "git:\n  defaultTime: '09:00'\n  user: dev\n").unwrap();
        let store = YamlConfigStore::new(&path);

        assert!(store.remove("git.defaultTime").await.unwrap());
        assert_eq!(store.get("git.defaultTime").await.unwrap(), None);
        assert_eq!(store.get("git.user").await.unwrap(), Some(json!("dev")));
    }

    #[tokio::test]
    async fn test_invalid_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = YamlConfigStore::new(dir.path().join("config.yaml"));

        assert!(store.get("git..time").await.is_err());
        assert!(store.set("", json!(1)).await.is_err());
    }
}
