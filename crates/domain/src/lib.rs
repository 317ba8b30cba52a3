//! Courier Domain - Core engine types
//!
//! This crate defines the data model of the Courier request engine: scoped
//! variables, reference expressions, execution snapshots, requests and
//! responses, security findings and test results.
//! All types here are pure Rust with no I/O dependencies.

pub mod collection;
pub mod environment;
pub mod error;
pub mod json_path;
pub mod reference;
pub mod request;
pub mod response;
pub mod scripting;
pub mod security;
pub mod settings;
pub mod testing;

pub use collection::{
    Container, ContainerKind, ExecutionKind, RequestItem, RequestSnapshot, ResponseSnapshot,
    SnapshotCatalog,
};
pub use environment::{
    ActiveEnvironment, ResolvedVariable, ScopeTarget, Variable, VariableMap, VariableScope,
    VariableStore,
};
pub use error::{DomainError, DomainResult};
pub use json_path::JsonPath;
pub use reference::{PathSegment, ReferenceExpression};
pub use request::{
    ApiKeyLocation, AuthConfig, FileAttachment, FormField, Header, Headers, HttpMethod,
    PreparedRequest, QueryParam, QueryParams, RequestBody,
};
pub use response::HttpResponse;
pub use scripting::{RequestScripts, Script, ScriptLanguage};
pub use security::{SecurityViolation, Severity, ValidationReport, ViolationKind};
pub use settings::{AdmissionSettings, EngineSettings, SandboxSettings, SecuritySettings};
pub use testing::{SCRIPT_EXECUTION_ERROR, TestAssertionResult, TestResults};
