//! HTTP request body types

use serde::{Deserialize, Serialize};

/// A key/value pair of a form body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Field name
    pub key: String,
    /// Field value
    pub value: String,
}

impl FormField {
    /// Creates a new form field.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A file attached to a multipart or binary body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Multipart field name (ignored for binary bodies).
    #[serde(default)]
    pub field: String,
    /// Original file name.
    pub file_name: String,
    /// MIME type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// File contents.
    #[serde(default)]
    pub data: Vec<u8>,
}

/// HTTP request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// Raw text (JSON, XML, plain text...). The content type lives in the headers.
    Raw {
        /// The body text
        content: String,
    },
    /// `application/x-www-form-urlencoded`
    FormUrlEncoded {
        /// Form fields
        fields: Vec<FormField>,
    },
    /// `multipart/form-data`
    FormData {
        /// Text fields
        #[serde(default)]
        fields: Vec<FormField>,
        /// Attached files
        #[serde(default)]
        files: Vec<FileAttachment>,
    },
    /// A single file sent as the whole body.
    Binary {
        /// The file
        file: FileAttachment,
    },
}

impl RequestBody {
    /// Creates a raw text body.
    #[must_use]
    pub fn raw(content: impl Into<String>) -> Self {
        Self::Raw {
            content: content.into(),
        }
    }

    /// Returns the body text for raw bodies.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Raw { content } => Some(content),
            _ => None,
        }
    }

    /// Returns true if replacing this body would discard attached files.
    #[must_use]
    pub fn holds_file_data(&self) -> bool {
        match self {
            Self::Binary { .. } => true,
            Self::FormData { files, .. } => !files.is_empty(),
            Self::None | Self::Raw { .. } | Self::FormUrlEncoded { .. } => false,
        }
    }

    /// Returns whether the body is empty or none.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Raw { content } => content.is_empty(),
            Self::FormUrlEncoded { fields } => fields.is_empty(),
            Self::FormData { fields, files } => fields.is_empty() && files.is_empty(),
            Self::Binary { .. } => false,
        }
    }
}
