//! Load engine settings use case

use courier_domain::EngineSettings;

use crate::ApplicationResult;
use crate::ports::{KeyValueStore, StorageError};

/// Key of the settings blob.
pub const SETTINGS_KEY: &str = "settings";

/// Reads [`EngineSettings`] from the key/value store.
pub struct LoadSettings<S> {
    store: S,
}

impl<S: KeyValueStore> LoadSettings<S> {
    /// Creates a new `LoadSettings` use case.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads the settings; a missing blob yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or the blob is malformed.
    pub async fn execute(&self) -> ApplicationResult<EngineSettings> {
        let mut values = self.store.get(&[SETTINGS_KEY]).await?;
        let Some(value) = values.remove(SETTINGS_KEY) else {
            return Ok(EngineSettings::default());
        };
        let settings = serde_json::from_value(value).map_err(|e| StorageError::InvalidData {
            key: SETTINGS_KEY.to_string(),
            message: e.to_string(),
        })?;
        Ok(settings)
    }
}
