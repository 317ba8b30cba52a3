//! Execution snapshot lookup port

use courier_domain::{ContainerKind, ExecutionKind, SnapshotCatalog};
use serde_json::Value;

/// Which part of a snapshot lookup came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMiss {
    /// No container with that kind and name.
    Container,
    /// The container has no item with that name.
    Item,
    /// The item exists but has never been executed.
    NoExecution,
}

/// Read-only access to the last execution snapshots of request items.
///
/// Lookups are synchronous: resolving a structured reference never suspends.
pub trait SnapshotSource: Send + Sync {
    /// Returns the snapshot of `execution` for item `item` inside the
    /// container `container` of kind `kind`, as JSON.
    ///
    /// # Errors
    /// Returns the [`SnapshotMiss`] naming the first missing part.
    fn snapshot(
        &self,
        kind: ContainerKind,
        container: &str,
        item: &str,
        execution: ExecutionKind,
    ) -> Result<Value, SnapshotMiss>;
}

impl SnapshotSource for SnapshotCatalog {
    fn snapshot(
        &self,
        kind: ContainerKind,
        container: &str,
        item: &str,
        execution: ExecutionKind,
    ) -> Result<Value, SnapshotMiss> {
        self.container(kind, container)
            .ok_or(SnapshotMiss::Container)?
            .item(item)
            .ok_or(SnapshotMiss::Item)?
            .snapshot_value(execution)
            .ok_or(SnapshotMiss::NoExecution)
    }
}
