//! Reference expression AST
//!
//! A reference expression names a value to substitute into request text:
//! - `{name}`: simple
//! - `{{name}}`: braced
//! - `${"collections"."Orders"."Get Order"."response"."body".jsonPath("$.id")}`: structured

use std::fmt;

/// One segment of a structured reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A quoted literal, e.g. `"headers"`.
    Literal(String),
    /// A `jsonPath("...")` query.
    JsonPath(String),
}

impl PathSegment {
    /// Returns the literal text, if this is a literal segment.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(text) => Some(text),
            Self::JsonPath(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write!(f, "{text:?}"),
            Self::JsonPath(expr) => write!(f, "jsonPath({expr:?})"),
        }
    }
}

/// A parsed reference expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceExpression {
    /// `{name}`
    Simple(String),
    /// `{{name}}`
    Braced(String),
    /// `${...}`
    Structured(Vec<PathSegment>),
}

impl ReferenceExpression {
    /// Returns the variable name for simple and braced references.
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Self::Simple(name) | Self::Braced(name) => Some(name),
            Self::Structured(_) => None,
        }
    }

    /// Returns true for the structured form.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

impl fmt::Display for ReferenceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(name) => write!(f, "{{{name}}}"),
            Self::Braced(name) => write!(f, "{{{{{name}}}}}"),
            Self::Structured(segments) => {
                let joined: Vec<String> = segments.iter().map(ToString::to_string).collect();
                write!(f, "${{{}}}", joined.join("."))
            }
        }
    }
}
