//! Authentication configuration types

use serde::{Deserialize, Serialize};

/// Location for API key authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyLocation {
    /// Sent as a request header
    #[default]
    Header,
    /// Sent as a query parameter
    Query,
}

/// Authentication configuration for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication
    #[default]
    None,
    /// API key authentication
    ApiKey {
        /// Header or query parameter name
        name: String,
        /// The API key value
        key: String,
        /// Where to add the key
        #[serde(default)]
        location: ApiKeyLocation,
    },
    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },
    /// Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
}

impl AuthConfig {
    /// Creates a bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates a basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns mutable references to every user-editable text field.
    pub fn text_fields_mut(&mut self) -> Vec<&mut String> {
        match self {
            Self::None => Vec::new(),
            Self::ApiKey { name, key, .. } => vec![name, key],
            Self::Bearer { token } => vec![token],
            Self::Basic { username, password } => vec![username, password],
        }
    }
}
