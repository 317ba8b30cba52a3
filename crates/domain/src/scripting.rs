//! Pre-request and test scripts.
//!
//! A script is either a line-oriented command list or a sandboxed script
//! evaluated by the embedded engine.

use serde::{Deserialize, Serialize};

/// A script attached to a request, run before sending or after receiving.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Script {
    /// The script content.
    pub content: String,
    /// Whether the script is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How the content is interpreted.
    #[serde(default)]
    pub language: ScriptLanguage,
}

const fn default_enabled() -> bool {
    true
}

impl Default for Script {
    fn default() -> Self {
        Self {
            content: String::new(),
            enabled: true,
            language: ScriptLanguage::default(),
        }
    }
}

impl Script {
    /// Create a command script.
    #[must_use]
    pub fn commands(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Create a sandboxed script.
    #[must_use]
    pub fn sandboxed(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            language: ScriptLanguage::Sandboxed,
            ..Self::default()
        }
    }

    /// Check if the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Check if the script should run.
    #[must_use]
    pub fn should_run(&self) -> bool {
        self.enabled && !self.is_empty()
    }
}

/// Script language type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptLanguage {
    /// One command per line (default).
    #[default]
    CommandDsl,
    /// Free-form script run inside the sandbox.
    Sandboxed,
}

/// Scripts attached to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestScripts {
    /// Runs after variable resolution, before sending.
    #[serde(default)]
    pub pre_request: Option<Script>,
    /// Runs against the response.
    #[serde(default)]
    pub tests: Option<Script>,
}

impl RequestScripts {
    /// Returns the pre-request script if it should run.
    #[must_use]
    pub fn runnable_pre_request(&self) -> Option<&Script> {
        self.pre_request.as_ref().filter(|s| s.should_run())
    }

    /// Returns the test script if it should run.
    #[must_use]
    pub fn runnable_tests(&self) -> Option<&Script> {
        self.tests.as_ref().filter(|s| s.should_run())
    }
}
