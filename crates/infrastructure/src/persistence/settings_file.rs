//! Engine settings file.
//!
//! A missing file yields the defaults; a partial file fills in the rest.

use std::path::Path;

use courier_domain::EngineSettings;
use tokio::fs;

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

/// Loads settings from `path`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_settings_file(path: &Path) -> Result<EngineSettings, SettingsError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(from_json_bytes(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineSettings::default()),
        Err(e) => Err(SettingsError::Io(e)),
    }
}

/// Writes settings to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_settings_file(path: &Path, settings: &EngineSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, to_json_stable_bytes(settings)?).await?;
    Ok(())
}
