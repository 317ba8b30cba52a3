//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod http_transport;
mod json_path;
mod key_value_store;
mod script_runner;
mod snapshot_source;

pub use clock::Clock;
pub use http_transport::{HttpTransport, TransportError};
pub use json_path::{JsonPathEvaluator, StandardJsonPath};
pub use key_value_store::{KeyValueStore, StorageError};
pub use script_runner::{ScriptConsole, ScriptError, ScriptOutcome, ScriptRunner};
pub use snapshot_source::{SnapshotMiss, SnapshotSource};
