//! Application error types

use courier_domain::DomainError;
use thiserror::Error;

use crate::admission::AdmissionError;
use crate::ports::{ScriptError, StorageError, TransportError};

/// Failure to parse or resolve a reference expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// The reference text is malformed.
    #[error("parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset of the reference in the input.
        position: usize,
        /// What was wrong.
        message: String,
    },

    /// A structured reference does not name container, item and execution kind.
    #[error("invalid structured reference: {0}")]
    InvalidStructure(String),

    /// A structured reference points at something that does not exist.
    #[error("resolution error: {0}")]
    Resolution(String),
}

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A reference could not be parsed or resolved.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The HTTP transport failed.
    #[error("HTTP error: {0}")]
    Transport(#[from] TransportError),

    /// A sandboxed script failed.
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// No admission slot freed up in time.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
