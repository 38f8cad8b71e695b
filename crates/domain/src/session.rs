//! Authenticated session model.
//!
//! A [`Session`] is the access token plus the identity it was issued to.
//! It is owned by the token store; everything else sees snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version of the persisted session file.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Role of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Team manager with administrative routes.
    Manager,
    /// Regular team member.
    #[default]
    Member,
}

impl Role {
    /// Maps the API's `is_manager` flag to a role.
    #[must_use]
    pub const fn from_manager_flag(is_manager: bool) -> Self {
        if is_manager { Self::Manager } else { Self::Member }
    }
}

/// Account flags reported by the API at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFlags {
    /// Whether the account is active.
    pub active: bool,
}

impl Default for IdentityFlags {
    fn default() -> Self {
        Self { active: true }
    }
}

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-side user id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role derived from the manager flag.
    #[serde(default)]
    pub role: Role,
    /// Account flags.
    #[serde(default)]
    pub flags: IdentityFlags,
}

/// The live session: access token and identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    /// Bearer access token; empty when unauthenticated.
    #[serde(default)]
    pub access_token: String,
    /// Signed-in identity, `None` when unauthenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

impl Session {
    /// Creates an authenticated session.
    #[must_use]
    pub fn new(identity: Identity, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            identity: Some(identity),
        }
    }

    /// The unauthenticated session.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true when an identity is attached.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns true when there is a token to sign requests with.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Short, log-safe preview of the token.
    #[must_use]
    pub fn token_preview(&self) -> String {
        token_preview(&self.access_token)
    }
}

/// Returns the first 8 characters of a token followed by `...`.
///
/// Short tokens are masked entirely.
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.is_empty() {
        "<none>".to_string()
    } else if token.len() > 12 {
        let head: String = token.chars().take(8).collect();
        format!("{head}...")
    } else {
        "***".to_string()
    }
}

/// On-disk envelope for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// File format version.
    pub schema_version: u32,
    /// When the session was written.
    pub saved_at: DateTime<Utc>,
    /// The session itself.
    pub session: Session,
}

impl PersistedSession {
    /// Wraps a session for writing.
    #[must_use]
    pub const fn new(session: Session, saved_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            saved_at,
            session,
        }
    }

    /// Returns true if this file can be read by this build.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.schema_version == SESSION_SCHEMA_VERSION
    }
}
