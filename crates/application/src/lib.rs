//! Courier Application - Resolution, interpreters and use cases
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for external dependencies)
//! - The reference parser and variable resolver
//! - The pre-request and test command interpreters
//! - Admission control for in-flight requests
//! - Use case orchestration

pub mod admission;
pub mod commands;
pub mod error;
pub mod ports;
pub mod use_cases;
pub mod variable_resolver;

pub use admission::{AdmissionController, AdmissionError, AdmissionPermit};
pub use error::{ApplicationError, ApplicationResult, ReferenceError};
pub use variable_resolver::{ResolutionResult, VariableResolver};
