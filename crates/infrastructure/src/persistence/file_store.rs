//! File-backed key/value store.
//!
//! All keys live in one JSON document written with stable formatting, so the
//! file diffs cleanly under version control. Writes go through a temporary
//! file and a rename.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courier_application::ports::{KeyValueStore, StorageError};
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

/// A [`KeyValueStore`] persisted as a single JSON file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the platform default location:
    /// - Linux: ~/.config/courier/store.json
    /// - macOS: ~/Library/Application Support/courier/store.json
    /// - Windows: %APPDATA%/courier/store.json
    #[must_use]
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("courier").join("store.json"))
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Value>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => from_json_bytes(&bytes).map_err(storage_error),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

fn storage_error(error: SerializationError) -> StorageError {
    match error {
        SerializationError::Io(e) => StorageError::Io(e),
        other => StorageError::Serialization(other.to_string()),
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        let mut all = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|key| all.remove(*key).map(|value| ((*key).to_string(), value)))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut all = self.read_all().await?;
        let count = entries.len();
        all.extend(entries);
        let bytes = to_json_stable_bytes(&all).map_err(storage_error)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, bytes).await?;
        fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), keys = count, "store written");
        Ok(())
    }
}
