//! Structured reference resolution
//!
//! A structured reference names a container kind, a container, an item, an
//! execution kind, then a path into that item's last execution snapshot:
//!
//! ```text
//! ${"collections"."Orders"."Get Order"."response"."body".jsonPath("$.data.id")}
//! ```
//!
//! The walk stops at the first `jsonPath(...)` segment and yields its first
//! match; anything after it is ignored.

use courier_domain::{ContainerKind, ExecutionKind, PathSegment, VariableStore};
use serde_json::Value;

use crate::error::ReferenceError;
use crate::ports::{JsonPathEvaluator, SnapshotMiss, SnapshotSource};

/// Resolves structured references against stored execution snapshots.
pub struct StructuredPathResolver<'a> {
    snapshots: &'a dyn SnapshotSource,
    json_path: &'a dyn JsonPathEvaluator,
    store: &'a VariableStore,
}

impl<'a> StructuredPathResolver<'a> {
    /// Creates a resolver over the given sources.
    #[must_use]
    pub fn new(
        snapshots: &'a dyn SnapshotSource,
        json_path: &'a dyn JsonPathEvaluator,
        store: &'a VariableStore,
    ) -> Self {
        Self {
            snapshots,
            json_path,
            store,
        }
    }

    /// Resolves a structured reference to text.
    ///
    /// A reference made of a single literal segment is looked up as a plain
    /// variable name.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::InvalidStructure`] if the leading segments do
    /// not name a container kind, container, item and execution kind, and
    /// [`ReferenceError::Resolution`] if anything along the path is missing.
    pub fn resolve(&self, segments: &[PathSegment]) -> Result<String, ReferenceError> {
        if let [PathSegment::Literal(name)] = segments {
            return self.store.resolve_value(name).ok_or_else(|| {
                ReferenceError::Resolution(format!("variable '{name}' is not defined"))
            });
        }

        let (head, path) = segments.split_at_checked(4).ok_or_else(|| {
            ReferenceError::InvalidStructure(
                "expected container kind, container, item and execution kind".to_string(),
            )
        })?;
        let [kind, container, item, execution] = head else {
            return Err(ReferenceError::InvalidStructure(
                "expected four leading segments".to_string(),
            ));
        };

        let kind: ContainerKind = literal(kind, "container kind")?.parse().map_err(
            |e: courier_domain::DomainError| ReferenceError::InvalidStructure(e.to_string()),
        )?;
        let container = literal(container, "container name")?;
        let item = literal(item, "item name")?;
        let execution: ExecutionKind = literal(execution, "execution kind")?.parse().map_err(
            |e: courier_domain::DomainError| ReferenceError::InvalidStructure(e.to_string()),
        )?;

        let snapshot = self
            .snapshots
            .snapshot(kind, container, item, execution)
            .map_err(|miss| {
                ReferenceError::Resolution(match miss {
                    SnapshotMiss::Container => format!("{kind} '{container}' not found"),
                    SnapshotMiss::Item => {
                        format!("request '{item}' not found in {kind} '{container}'")
                    }
                    SnapshotMiss::NoExecution => {
                        format!("request '{item}' in {kind} '{container}' has no {execution} yet")
                    }
                })
            })?;

        self.walk(snapshot, path).map(render)
    }

    fn walk(&self, mut current: Value, path: &[PathSegment]) -> Result<Value, ReferenceError> {
        let mut index = 0;
        while let Some(segment) = path.get(index) {
            index += 1;
            match segment {
                PathSegment::JsonPath(expression) => {
                    let matches = self
                        .json_path
                        .query(expression, &current)
                        .map_err(|e| ReferenceError::Resolution(e.to_string()))?;
                    return matches.into_iter().next().ok_or_else(|| {
                        ReferenceError::Resolution(format!(
                            "JSONPath '{expression}' matched nothing"
                        ))
                    });
                }
                PathSegment::Literal(key) if key == "headers" => {
                    current = field(&current, key)?;
                    if let Some(PathSegment::Literal(name)) = path.get(index) {
                        index += 1;
                        current = header(&current, name)?;
                    }
                }
                PathSegment::Literal(key) if key == "body" => {
                    current = field(&current, key)?;
                    if index < path.len()
                        && let Value::String(text) = &current
                    {
                        current = serde_json::from_str(text).map_err(|e| {
                            ReferenceError::Resolution(format!("body is not valid JSON: {e}"))
                        })?;
                    }
                }
                PathSegment::Literal(key) => current = field(&current, key)?,
            }
        }
        Ok(current)
    }
}

fn literal<'s>(segment: &'s PathSegment, what: &str) -> Result<&'s str, ReferenceError> {
    segment.as_literal().ok_or_else(|| {
        ReferenceError::InvalidStructure(format!("{what} must be a quoted literal, found {segment}"))
    })
}

fn field(current: &Value, key: &str) -> Result<Value, ReferenceError> {
    let found = match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    };
    found
        .cloned()
        .ok_or_else(|| ReferenceError::Resolution(format!("'{key}' not found")))
}

fn header(headers: &Value, name: &str) -> Result<Value, ReferenceError> {
    headers
        .as_object()
        .and_then(|map| {
            map.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        })
        .ok_or_else(|| ReferenceError::Resolution(format!("header '{name}' not found")))
}

/// Strings are substituted without quotes; everything else as compact JSON.
fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
