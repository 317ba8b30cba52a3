//! Collections, scenarios and their execution snapshots

mod item;
mod snapshot;

pub use item::{Container, RequestItem, SnapshotCatalog};
pub use snapshot::{ContainerKind, ExecutionKind, RequestSnapshot, ResponseSnapshot};
