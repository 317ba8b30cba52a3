//! In-memory key/value store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_application::ports::{KeyValueStore, StorageError};
use parking_lot::RwLock;
use serde_json::Value;

/// A [`KeyValueStore`] kept in process memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values.read().clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        let values = self.values.read();
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError> {
        self.values.write().extend(entries);
        Ok(())
    }
}
