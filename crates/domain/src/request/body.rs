//! HTTP Request body types

use serde::{Deserialize, Serialize};

/// HTTP request body with content and type information.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// JSON document, serialized when the request is sent
    Json(serde_json::Value),
    /// Raw text with an explicit content type
    Raw {
        /// The content type (e.g., "text/plain")
        content_type: String,
        /// The body content
        content: String,
    },
}

impl RequestBody {
    /// Creates a JSON body.
    #[must_use]
    pub const fn json(value: serde_json::Value) -> Self {
        Self::Json(value)
    }

    /// Creates a plain text body.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Raw {
            content_type: "text/plain".to_string(),
            content: content.into(),
        }
    }

    /// Returns whether the body is absent.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the content type if applicable.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Json(_) => Some("application/json"),
            Self::Raw { content_type, .. } => Some(content_type),
        }
    }

    /// Encodes the body to the bytes that go on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::None => Vec::new(),
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Raw { content, .. } => content.as_bytes().to_vec(),
        }
    }
}
