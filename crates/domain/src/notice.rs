//! User-facing notices emitted by the request pipeline.

use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The refresh credential was rejected; the user must sign in again.
    SessionExpired,
    /// The server answered 403 for an action.
    PermissionDenied,
}

/// How loudly to show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something failed.
    Error,
}

/// A one-way message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Notice category.
    pub kind: NoticeKind,
    /// Severity.
    pub level: NoticeLevel,
    /// Text to display.
    pub message: String,
}

impl Notice {
    /// "Session expired" notice shown once per teardown.
    #[must_use]
    pub fn session_expired() -> Self {
        Self {
            kind: NoticeKind::SessionExpired,
            level: NoticeLevel::Error,
            message: "Your session has expired. Please log in again.".to_string(),
        }
    }

    /// "Permission denied" notice shown for a 403.
    #[must_use]
    pub fn permission_denied() -> Self {
        Self {
            kind: NoticeKind::PermissionDenied,
            level: NoticeLevel::Error,
            message: "You don't have permission for this action".to_string(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
