//! Persistent key/value store port
//!
//! Variable scopes and settings are stored as JSON blobs under fixed keys
//! (`global`, `collection`, `env_<id>`, `settings`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// Errors that can occur while reading or writing the store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored blob does not have the expected shape.
    #[error("Invalid data under '{key}': {message}")]
    InvalidData {
        /// Store key
        key: String,
        /// What was wrong
        message: String,
    },
}

/// A persistent store of JSON values keyed by string.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the given keys. Missing keys are absent from the returned map.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError>;

    /// Writes every entry, replacing existing values.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        (**self).get(keys).await
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError> {
        (**self).set(entries).await
    }
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        (**self).get(keys).await
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError> {
        (**self).set(entries).await
    }
}
