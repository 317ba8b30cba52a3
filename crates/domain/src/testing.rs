//! Response test results.
//!
//! A test script produces one [`TestAssertionResult`] per evaluated line. The
//! ordered list is what the user sees and what gets stored on the request's
//! last response snapshot.

use serde::{Deserialize, Serialize};

/// Name of the synthetic result that replaces a test run which failed as a whole.
pub const SCRIPT_EXECUTION_ERROR: &str = "Script Execution Error";

/// Result of running a single assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAssertionResult {
    /// Display name, usually the assertion line itself.
    pub name: String,
    /// Whether the assertion passed.
    pub passed: bool,
    /// Error message if failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestAssertionResult {
    /// Create a passed result.
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
        }
    }

    /// Create a failed result.
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
        }
    }

    /// The single result reported when a whole test script fails.
    #[must_use]
    pub fn script_error(error: impl Into<String>) -> Self {
        Self::fail(SCRIPT_EXECUTION_ERROR, error)
    }
}

/// Summary over the results of one test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestResults {
    /// Individual results, in script order.
    pub results: Vec<TestAssertionResult>,
    /// Total number of assertions.
    pub total: usize,
    /// Number of passed assertions.
    pub passed: usize,
    /// Number of failed assertions.
    pub failed: usize,
}

impl TestResults {
    /// Builds the summary from an ordered result list.
    #[must_use]
    pub fn new(results: Vec<TestAssertionResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            results,
            total,
            passed,
            failed: total - passed,
        }
    }

    /// Check if all tests passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Get pass rate as percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_results_summary() {
        let results = TestResults::new(vec![
            TestAssertionResult::pass("status 200"),
            TestAssertionResult::fail("headerExists X-Id", "Header 'X-Id' not found"),
        ]);
        assert_eq!(results.total, 2);
        assert_eq!(results.passed, 1);
        assert_eq!(results.failed, 1);
        assert!(!results.all_passed());
        assert!((results.pass_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_results_pass() {
        let results = TestResults::new(Vec::new());
        assert!(results.all_passed());
        assert!((results.pass_rate() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_script_error_result() {
        let result = TestAssertionResult::script_error("boom");
        assert_eq!(result.name, SCRIPT_EXECUTION_ERROR);
        assert!(!result.passed);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_error_skipped_when_passed() {
        let json = serde_json::to_string(&TestAssertionResult::pass("ok")).unwrap_or_default();
        assert_eq!(json, r#"{"name":"ok","passed":true}"#);
    }
}
