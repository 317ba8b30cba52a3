//! Courier Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the script validator and sandbox,
//! key/value stores, the HTTP transport, the system clock and logging setup.

pub mod adapters;
pub mod logging;
pub mod persistence;
pub mod scripting;
pub mod serialization;

pub use adapters::{ReqwestTransport, SystemClock};
pub use logging::init_tracing;
pub use persistence::{
    FileKeyValueStore, MemoryKeyValueStore, SettingsError, load_settings_file, save_settings_file,
};
pub use scripting::{ScriptSandbox, ScriptSecurityValidator, TracingConsole};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
