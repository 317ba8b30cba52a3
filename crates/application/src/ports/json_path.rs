//! JSONPath evaluator port

use courier_domain::{DomainError, json_path};
use serde_json::Value;

/// Evaluates JSONPath queries.
pub trait JsonPathEvaluator: Send + Sync {
    /// Returns every value matched by `expression`, in document order.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidJsonPath`] for malformed expressions.
    fn query(&self, expression: &str, json: &Value) -> Result<Vec<Value>, DomainError>;
}

/// The evaluator backed by the domain's JSONPath implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardJsonPath;

impl JsonPathEvaluator for StandardJsonPath {
    fn query(&self, expression: &str, json: &Value) -> Result<Vec<Value>, DomainError> {
        json_path::query(expression, json)
    }
}
