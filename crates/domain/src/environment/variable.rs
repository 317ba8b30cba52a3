//! Variable types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a single variable with its value and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// The variable value.
    pub value: String,

    /// Free-form description shown next to the variable.
    #[serde(default)]
    pub description: String,

    /// Whether this variable is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Variable {
    /// Creates a new enabled variable without description.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: String::new(),
            enabled: true,
        }
    }

    /// Creates a disabled variable.
    #[must_use]
    pub fn disabled(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: String::new(),
            enabled: false,
        }
    }

    /// Adds a description to this variable.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the value if the variable is enabled.
    #[must_use]
    pub fn enabled_value(&self) -> Option<&str> {
        if self.enabled {
            Some(&self.value)
        } else {
            None
        }
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// A collection of variables keyed by name.
pub type VariableMap = HashMap<String, Variable>;

/// The scope a variable was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    /// Process-lifetime values written during one pipeline run.
    Runtime,
    /// The active environment.
    Environment,
    /// Workspace-wide globals.
    Global,
    /// The current collection.
    Collection,
}

impl VariableScope {
    /// Scopes in resolution order (first hit wins).
    pub const RESOLUTION_ORDER: [Self; 4] =
        [Self::Runtime, Self::Environment, Self::Global, Self::Collection];

    /// Returns a human-readable name for the scope.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Runtime => "Runtime",
            Self::Environment => "Environment",
            Self::Global => "Global",
            Self::Collection => "Collection",
        }
    }
}

/// A resolved variable with its value and origin scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariable {
    /// The variable name.
    pub name: String,
    /// The resolved value.
    pub value: String,
    /// The scope from which this value was resolved.
    pub scope: VariableScope,
}

impl ResolvedVariable {
    /// Creates a new resolved variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, scope: VariableScope) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            scope,
        }
    }
}
