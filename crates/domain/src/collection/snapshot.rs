//! Execution snapshots
//!
//! The last captured request and response of a named request item. Snapshots
//! are overwritten on every execution and read by structured references.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;
use crate::request::{PreparedRequest, RequestBody};
use crate::response::HttpResponse;
use crate::testing::TestAssertionResult;

/// Which kind of container a structured reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Ordered request scenarios.
    Scenarios,
    /// Request collections.
    Collections,
}

impl FromStr for ContainerKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scenarios" => Ok(Self::Scenarios),
            "collections" => Ok(Self::Collections),
            other => Err(DomainError::UnknownContainerKind(other.to_string())),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scenarios => "scenarios",
            Self::Collections => "collections",
        })
    }
}

/// Which half of an execution a structured reference reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// The request as it was sent.
    Request,
    /// The response as it was received.
    Response,
}

impl FromStr for ExecutionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "response" => Ok(Self::Response),
            other => Err(DomainError::UnknownExecutionKind(other.to_string())),
        }
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Response => "response",
        })
    }
}

/// The request half of an execution, as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// HTTP method
    pub method: String,
    /// Fully resolved URL
    pub url: String,
    /// Enabled headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Enabled query parameters
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Body: text for raw bodies, an object for forms, null when absent
    #[serde(default)]
    pub body: Value,
    /// Auth configuration
    #[serde(default)]
    pub auth: Value,
    /// When the request was sent
    pub captured_at: DateTime<Utc>,
}

impl RequestSnapshot {
    /// Captures a resolved request.
    #[must_use]
    pub fn capture(request: &PreparedRequest, captured_at: DateTime<Utc>) -> Self {
        let body = match &request.body {
            RequestBody::None => Value::Null,
            RequestBody::Raw { content } => Value::String(content.clone()),
            RequestBody::FormUrlEncoded { fields } => fields
                .iter()
                .map(|f| (f.key.clone(), Value::String(f.value.clone())))
                .collect::<serde_json::Map<_, _>>()
                .into(),
            RequestBody::FormData { fields, files } => {
                let mut map: serde_json::Map<String, Value> = fields
                    .iter()
                    .map(|f| (f.key.clone(), Value::String(f.value.clone())))
                    .collect();
                for file in files {
                    map.insert(file.field.clone(), Value::String(file.file_name.clone()));
                }
                map.into()
            }
            RequestBody::Binary { file } => Value::String(file.file_name.clone()),
        };

        Self {
            method: request.method.to_string(),
            url: request.url.clone(),
            headers: request
                .headers
                .enabled()
                .map(|h| (h.name.clone(), h.value.clone()))
                .collect(),
            params: request
                .params
                .enabled()
                .map(|p| (p.key.clone(), p.value.clone()))
                .collect(),
            body,
            auth: serde_json::to_value(&request.auth).unwrap_or_default(),
            captured_at,
        }
    }
}

/// The response half of an execution, as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    /// HTTP status code
    pub status: u16,
    /// Round-trip time in milliseconds
    pub duration: u64,
    /// Body size in bytes
    pub size: usize,
    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Body text
    #[serde(default)]
    pub body: Value,
    /// Results of the test script run against this response
    #[serde(default)]
    pub test_results: Vec<TestAssertionResult>,
    /// When the response was received
    pub captured_at: DateTime<Utc>,
}

impl ResponseSnapshot {
    /// Captures a transport response together with its test results.
    #[must_use]
    pub fn capture(
        response: &HttpResponse,
        test_results: Vec<TestAssertionResult>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: response.status,
            duration: u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX),
            size: response.size(),
            headers: response
                .headers
                .enabled()
                .map(|h| (h.name.clone(), h.value.clone()))
                .collect(),
            body: Value::String(response.body.clone()),
            test_results,
            captured_at,
        }
    }
}
