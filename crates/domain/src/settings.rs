//! Engine configuration
//!
//! Every field has a default so a partial (or missing) settings document
//! still produces a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied to sandboxed scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Wall-clock limit for one script run, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of engine operations before the script is aborted.
    pub max_operations: u64,
    /// Maximum length of any string the script builds.
    pub max_string_size: usize,
    /// Maximum expression nesting depth.
    pub max_expr_depth: usize,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_operations: 1_000_000,
            max_string_size: 1024 * 1024,
            max_expr_depth: 64,
        }
    }
}

impl SandboxSettings {
    /// The timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Static validation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Scripts longer than this (in characters) are flagged.
    pub max_script_length: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_script_length: 50_000,
        }
    }
}

/// Concurrency ceiling for request executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionSettings {
    /// Requests allowed in flight at once.
    pub max_in_flight: usize,
    /// Base delay of the wait schedule, in milliseconds.
    pub base_delay_ms: u64,
    /// Number of wait steps before a caller is rejected.
    pub max_attempts: u32,
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 5,
            base_delay_ms: 100,
            max_attempts: 10,
        }
    }
}

impl AdmissionSettings {
    /// Total time a caller may wait for a slot: `base_delay * attempt` summed
    /// over every attempt.
    #[must_use]
    pub fn wait_window(&self) -> Duration {
        let steps: u64 = (1..=u64::from(self.max_attempts)).sum();
        Duration::from_millis(self.base_delay_ms.saturating_mul(steps))
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Sandbox limits
    pub sandbox: SandboxSettings,
    /// Validator thresholds
    pub security: SecuritySettings,
    /// Admission control
    pub admission: AdmissionSettings,
}
