//! Sandboxed script execution port

use async_trait::async_trait;
use courier_domain::{SecurityViolation, TestAssertionResult};
use serde_json::Value;

/// Why a sandboxed script did not complete.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ScriptError {
    /// Static validation found at least one critical violation.
    #[error("Script blocked by security validation: {message}")]
    SecurityViolation {
        /// Every finding, joined into one line.
        message: String,
        /// Every finding.
        violations: Vec<SecurityViolation>,
    },

    /// The script ran past its wall-clock limit.
    #[error("Script timed out after {timeout_ms} ms")]
    Timeout {
        /// The limit that was exceeded.
        timeout_ms: u64,
    },

    /// The script could not be compiled.
    #[error("Compilation failed: {0}")]
    Compilation(String),

    /// The script failed while running.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// What a successful script run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptOutcome {
    /// The context object after the run; scripts may have changed it.
    pub context: Value,
    /// Results recorded through `test(name, passed)`.
    pub tests: Vec<TestAssertionResult>,
    /// Lines printed by the script.
    pub logs: Vec<String>,
}

/// Receives output printed by scripts.
pub trait ScriptConsole: Send + Sync {
    /// Called once per printed line.
    fn log(&self, line: &str);
}

/// Runs a script inside a restricted, time-boxed environment.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Validates and runs `script`. Each top-level key of `context` is
    /// visible to the script as a variable.
    ///
    /// # Errors
    /// Returns a [`ScriptError`] if validation blocks the script or the run fails.
    async fn run(&self, script: &str, context: Value) -> Result<ScriptOutcome, ScriptError>;
}
