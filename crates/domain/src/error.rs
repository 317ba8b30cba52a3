//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A write targeted the environment scope while no environment is active.
    #[error("no active environment")]
    NoActiveEnvironment,

    /// A structured reference named a container kind other than scenarios/collections.
    #[error("unknown container kind: {0}")]
    UnknownContainerKind(String),

    /// A structured reference named an execution kind other than request/response.
    #[error("unknown execution kind: {0}")]
    UnknownExecutionKind(String),

    /// A JSONPath expression could not be parsed.
    #[error("invalid JSONPath '{expression}': {message}")]
    InvalidJsonPath {
        /// The offending expression.
        expression: String,
        /// What was wrong with it.
        message: String,
    },
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
