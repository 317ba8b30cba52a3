//! Script security findings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a finding is. Only [`Severity::Critical`] blocks execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational
    Low,
    /// Suspicious
    Medium,
    /// Advisory, does not block
    High,
    /// Blocks execution
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        })
    }
}

/// Category of a security finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Script exceeds the maximum length.
    ScriptTooLong,
    /// Script uses a denied API or construct.
    DangerousPattern,
    /// Script looks deliberately obfuscated.
    Obfuscation,
}

/// One finding produced by the script security validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityViolation {
    /// Category of the finding.
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
    /// Severity level.
    pub severity: Severity,
    /// The rule that matched, when the finding came from a pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl SecurityViolation {
    /// Creates a finding without a pattern.
    #[must_use]
    pub fn new(kind: ViolationKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity,
            pattern: None,
        }
    }

    /// Attaches the matching rule (builder pattern).
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

impl fmt::Display for SecurityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Outcome of validating one script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// False iff at least one violation is critical.
    pub is_valid: bool,
    /// Every finding, in rule order.
    pub violations: Vec<SecurityViolation>,
}

impl ValidationReport {
    /// Builds a report, deriving validity from the violations.
    #[must_use]
    pub fn from_violations(violations: Vec<SecurityViolation>) -> Self {
        let is_valid = !violations
            .iter()
            .any(|v| v.severity == Severity::Critical);
        Self {
            is_valid,
            violations,
        }
    }

    /// Returns the critical findings only.
    pub fn critical(&self) -> impl Iterator<Item = &SecurityViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
    }

    /// Returns one line listing every finding, for error messages.
    #[must_use]
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_only_critical_blocks() {
        let report = ValidationReport::from_violations(vec![SecurityViolation::new(
            ViolationKind::Obfuscation,
            Severity::High,
            "long hex run",
        )]);
        assert!(report.is_valid);

        let report = ValidationReport::from_violations(vec![
            SecurityViolation::new(ViolationKind::Obfuscation, Severity::High, "long hex run"),
            SecurityViolation::new(ViolationKind::DangerousPattern, Severity::Critical, "eval"),
        ]);
        assert!(!report.is_valid);
        assert_eq!(report.critical().count(), 1);
    }

    #[test]
    fn test_summary_lists_all() {
        let report = ValidationReport::from_violations(vec![
            SecurityViolation::new(ViolationKind::ScriptTooLong, Severity::High, "too long"),
            SecurityViolation::new(ViolationKind::DangerousPattern, Severity::Critical, "eval"),
        ]);
        assert_eq!(report.summary(), "[HIGH] too long; [CRITICAL] eval");
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
    }
}
