//! Key/value configuration seam used by config undos

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::HistoryResult;

/// Configuration storage addressed by dotted keys
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Current value of `key`, if set
    async fn get(&self, key: &str) -> HistoryResult<Option<Value>>;

    /// Set `key` to `value`
    async fn set(&self, key: &str, value: Value) -> HistoryResult<()>;

    /// Remove `key`; returns whether it was present
    async fn remove(&self, key: &str) -> HistoryResult<bool>;
}

/// Config store kept in memory
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `values`
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, key: &str) -> HistoryResult<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> HistoryResult<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> HistoryResult<bool> {
        Ok(self.values.write().await.remove(key).is_some())
    }
}
