//! Persistence adapters.

mod file_store;
mod memory_store;
mod settings_file;

pub use file_store::FileKeyValueStore;
pub use memory_store::MemoryKeyValueStore;
pub use settings_file::{SettingsError, load_settings_file, save_settings_file};
