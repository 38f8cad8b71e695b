//! Client Settings Domain Model
//!
//! Defines the configuration surface of the API client. Loading is done
//! by the infrastructure layer; this module only holds values, defaults
//! and validation.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default refresh-call timeout in milliseconds.
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 10_000;

/// Settings for the authenticated API client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL every request path is resolved against.
    pub base_url: String,
    /// Login endpoint path.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Refresh endpoint path.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Logout endpoint path.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Navigation route shown after the session ends.
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Timeout applied to every API request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Timeout applied to the refresh call.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,
    /// Directory holding `session.json`; platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_refresh_path() -> String {
    "/auth/refresh_token".to_string()
}

fn default_logout_path() -> String {
    "/auth/logout".to_string()
}

fn default_login_route() -> String {
    "/login".to_string()
}

const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

const fn default_refresh_timeout_ms() -> u64 {
    DEFAULT_REFRESH_TIMEOUT_MS
}

fn default_user_agent() -> String {
    concat!("Roster/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientSettings {
    /// Settings for `base_url` with every other field at its default.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            login_path: default_login_path(),
            refresh_path: default_refresh_path(),
            logout_path: default_logout_path(),
            login_route: default_login_route(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            refresh_timeout_ms: DEFAULT_REFRESH_TIMEOUT_MS,
            data_dir: None,
            user_agent: default_user_agent(),
        }
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Refresh timeout as a `Duration`.
    #[must_use]
    pub const fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    /// Checks the values that cannot be expressed by types alone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSetting` for an empty base URL, zero
    /// timeouts or a login route that is not an absolute path.
    pub fn validate(&self) -> DomainResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(DomainError::InvalidSetting {
                name: "base_url",
                reason: "must be set (ROSTER_BASE_URL)".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(DomainError::InvalidSetting {
                name: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.refresh_timeout_ms == 0 {
            return Err(DomainError::InvalidSetting {
                name: "refresh_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.login_route.starts_with('/') {
            return Err(DomainError::InvalidSetting {
                name: "login_route",
                reason: format!("must start with '/': {}", self.login_route),
            });
        }
        Ok(())
    }
}
