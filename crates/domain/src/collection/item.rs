//! Containers and request items
//!
//! Collections and scenarios both hold named request items. Each item keeps
//! its authored request plus the snapshots of its last execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::snapshot::{ContainerKind, ExecutionKind, RequestSnapshot, ResponseSnapshot};
use crate::request::PreparedRequest;
use crate::scripting::RequestScripts;

/// A named request inside a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    /// Unique identifier
    pub id: Uuid,
    /// Item name (what structured references match on)
    pub name: String,
    /// The authored request
    #[serde(default)]
    pub request: PreparedRequest,
    /// Pre-request and test scripts
    #[serde(default)]
    pub scripts: RequestScripts,
    /// Request half of the last execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_request: Option<RequestSnapshot>,
    /// Response half of the last execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response: Option<ResponseSnapshot>,
}

impl RequestItem {
    /// Creates an item that has never been executed.
    #[must_use]
    pub fn new(name: impl Into<String>, request: PreparedRequest) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            request,
            scripts: RequestScripts::default(),
            last_request: None,
            last_response: None,
        }
    }

    /// Attaches scripts (builder pattern).
    #[must_use]
    pub fn with_scripts(mut self, scripts: RequestScripts) -> Self {
        self.scripts = scripts;
        self
    }

    /// Overwrites both snapshots with a fresh execution.
    pub fn record_execution(&mut self, request: RequestSnapshot, response: ResponseSnapshot) {
        self.last_request = Some(request);
        self.last_response = Some(response);
    }

    /// Returns the requested snapshot as JSON, or `None` if never executed.
    #[must_use]
    pub fn snapshot_value(&self, kind: ExecutionKind) -> Option<Value> {
        match kind {
            ExecutionKind::Request => self
                .last_request
                .as_ref()
                .and_then(|s| serde_json::to_value(s).ok()),
            ExecutionKind::Response => self
                .last_response
                .as_ref()
                .and_then(|s| serde_json::to_value(s).ok()),
        }
    }
}

/// A collection or scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Unique identifier
    pub id: Uuid,
    /// Collection or scenario
    pub kind: ContainerKind,
    /// Container name
    pub name: String,
    /// Items, in display order
    #[serde(default)]
    pub items: Vec<RequestItem>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new(kind: ContainerKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Adds an item (builder pattern).
    #[must_use]
    pub fn with_item(mut self, item: RequestItem) -> Self {
        self.items.push(item);
        self
    }

    /// First item whose name matches exactly.
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&RequestItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Mutable access to the first item whose name matches exactly.
    pub fn item_mut(&mut self, name: &str) -> Option<&mut RequestItem> {
        self.items.iter_mut().find(|item| item.name == name)
    }
}

/// Every container whose snapshots structured references can read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCatalog {
    /// All known containers
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl SnapshotCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a container (builder pattern).
    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    /// First container of this kind whose name matches exactly.
    #[must_use]
    pub fn container(&self, kind: ContainerKind, name: &str) -> Option<&Container> {
        self.containers
            .iter()
            .find(|c| c.kind == kind && c.name == name)
    }

    /// Mutable access to a container.
    pub fn container_mut(&mut self, kind: ContainerKind, name: &str) -> Option<&mut Container> {
        self.containers
            .iter_mut()
            .find(|c| c.kind == kind && c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_exact_match_wins() {
        let mut first = RequestItem::new("Get Order", PreparedRequest::get("https://a"));
        first.request.url = "https://first".to_string();
        let second = RequestItem::new("Get Order", PreparedRequest::get("https://second"));
        let container = Container::new(ContainerKind::Collections, "Orders")
            .with_item(first)
            .with_item(second)
            .with_item(RequestItem::new("get order", PreparedRequest::get("https://lower")));

        assert_eq!(
            container.item("Get Order").map(|i| i.request.url.as_str()),
            Some("https://first")
        );
        assert!(container.item("GET ORDER").is_none());
    }

    #[test]
    fn test_catalog_distinguishes_kinds() {
        let catalog = SnapshotCatalog::new()
            .with_container(Container::new(ContainerKind::Scenarios, "Checkout"));
        assert!(catalog.container(ContainerKind::Scenarios, "Checkout").is_some());
        assert!(catalog.container(ContainerKind::Collections, "Checkout").is_none());
    }

    #[test]
    fn test_snapshot_value_absent_until_executed() {
        let mut item = RequestItem::new("Ping", PreparedRequest::get("https://ping"));
        assert_eq!(item.snapshot_value(ExecutionKind::Response), None);

        let request = RequestSnapshot::capture(&item.request, Utc::now());
        let response = ResponseSnapshot::capture(
            &crate::response::HttpResponse::new(200, "pong"),
            Vec::new(),
            Utc::now(),
        );
        item.record_execution(request, response);

        let value = item.snapshot_value(ExecutionKind::Response);
        assert_eq!(value.map(|v| v["body"].clone()), Some(Value::String("pong".into())));
    }
}
