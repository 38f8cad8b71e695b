//! Verbs the roster API accepts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verb of an API call.
///
/// The roster API only routes these five; anything else is a programming
/// error rather than user input, so there is no parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Reads such as the member dashboard.
    #[default]
    Get,
    /// Login, logout, refresh and record creation.
    Post,
    /// Full replacement.
    Put,
    /// Partial update.
    Patch,
    /// Removal, e.g. of a member by a manager.
    Delete,
}

impl HttpMethod {
    /// Wire name, as written in logs and on the request line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_uses_wire_name() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(format!("{} /auth/logout", HttpMethod::Post), "POST /auth/logout");
    }

    #[test]
    fn test_serializes_uppercase() {
        let json = serde_json::to_string(&HttpMethod::Delete).unwrap_or_default();
        assert_eq!(json, "\"DELETE\"");
    }
}
