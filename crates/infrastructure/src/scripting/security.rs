//! Static script validation.
//!
//! Runs before every sandboxed execution. Dangerous API usage is critical and
//! blocks the run; length and obfuscation findings are advisory.

use std::sync::LazyLock;

use courier_domain::{SecurityViolation, Severity, ValidationReport, ViolationKind};
use regex::Regex;

struct Rule {
    regex: Regex,
    description: &'static str,
}

impl Rule {
    #[allow(clippy::expect_used)]
    fn new(pattern: &str, description: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("valid regex"),
            description,
        }
    }
}

static DANGEROUS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\beval\s*\(", "Dynamic code evaluation (eval)"),
        Rule::new(r"\bFunction\s*\(", "Dynamic function construction (Function)"),
        Rule::new(r"\bsetTimeout\s*\(", "Timer scheduling (setTimeout)"),
        Rule::new(r"\bsetInterval\s*\(", "Timer scheduling (setInterval)"),
        Rule::new(r"\b(?:fetch|XMLHttpRequest|WebSocket)\b", "Network access"),
        Rule::new(r"\b(?:localStorage|sessionStorage|indexedDB)\b", "Storage access"),
        Rule::new(
            r"\b(?:window|document|globalThis|global|process)\s*[.\[]",
            "Global object access",
        ),
        Rule::new(r"\b(?:require|import)\s*\(", "Module loading"),
        Rule::new(r#"\bimport\s+["'`]"#, "Module import statement"),
        Rule::new(r"__proto__", "Prototype manipulation (__proto__)"),
        Rule::new(
            r#"constructor\s*\.\s*constructor|\[\s*["']constructor["']\s*\]"#,
            "Constructor chain access",
        ),
        Rule::new(r"\.\s*(?:call|apply|bind)\s*\(", "Function rebinding (call/apply/bind)"),
    ]
});

static OBFUSCATION: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"[A-Za-z_$][A-Za-z0-9_$]{50,}", "Unusually long identifier"),
        Rule::new(r"(?:0x)?[0-9a-fA-F]{32,}", "Long hexadecimal run"),
        Rule::new(r"\\x[0-9a-fA-F]{2}", "Hex escape sequence"),
        Rule::new(r"\\u[0-9a-fA-F]{4}", "Unicode escape sequence"),
        Rule::new(r#"\beval\s*\(\s*["'`]"#, "eval called with a string literal"),
    ]
});

#[allow(clippy::expect_used)]
static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`"#).expect("valid regex")
});

/// Checks scripts for dangerous constructs before they run.
#[derive(Debug, Clone, Copy)]
pub struct ScriptSecurityValidator {
    max_script_length: usize,
}

impl Default for ScriptSecurityValidator {
    fn default() -> Self {
        Self::new(50_000)
    }
}

impl ScriptSecurityValidator {
    /// Creates a validator that flags scripts longer than `max_script_length` characters.
    #[must_use]
    pub const fn new(max_script_length: usize) -> Self {
        Self { max_script_length }
    }

    /// Validates a script. Only critical findings make the report invalid.
    #[must_use]
    pub fn validate(&self, script: &str) -> ValidationReport {
        let mut violations = Vec::new();

        let length = script.chars().count();
        if length > self.max_script_length {
            violations.push(SecurityViolation::new(
                ViolationKind::ScriptTooLong,
                Severity::High,
                format!(
                    "Script is {length} characters long (limit {})",
                    self.max_script_length
                ),
            ));
        }

        for rule in DANGEROUS.iter() {
            if rule.regex.is_match(script) {
                violations.push(
                    SecurityViolation::new(
                        ViolationKind::DangerousPattern,
                        Severity::Critical,
                        rule.description,
                    )
                    .with_pattern(rule.regex.as_str()),
                );
            }
        }

        // Quoted text is replaced by empty literals so the quotes stay visible.
        let code = STRING_LITERAL.replace_all(script, "\"\"");
        for rule in OBFUSCATION.iter() {
            if rule.regex.is_match(&code) {
                violations.push(
                    SecurityViolation::new(
                        ViolationKind::Obfuscation,
                        Severity::High,
                        format!("Possible obfuscation: {}", rule.description),
                    )
                    .with_pattern(rule.regex.as_str()),
                );
            }
        }

        ValidationReport::from_violations(violations)
    }
}
