//! Application error types

use roster_domain::ApiResponse;
use thiserror::Error;

use crate::ports::TransportError;

/// Final outcome of a failed API call, as seen by the caller.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 401 that could not be recovered by a refresh.
    #[error("unauthorized: {}", .0.status_code())]
    Unauthorized(ApiResponse),

    /// 403; the session is left untouched.
    #[error("forbidden: {}", .0.status_code())]
    Forbidden(ApiResponse),

    /// Any other 4xx/5xx, passed through uninterpreted.
    #[error("request failed: {}", .0.status_code())]
    Status(ApiResponse),
}

impl ApiError {
    /// The response behind the error, if one was received.
    #[must_use]
    pub const fn response(&self) -> Option<&ApiResponse> {
        match self {
            Self::Transport(_) => None,
            Self::Unauthorized(r) | Self::Forbidden(r) | Self::Status(r) => Some(r),
        }
    }

    /// HTTP status, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    /// Returns true for an unrecovered 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Result type alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Why a token refresh did not produce a usable token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The refresh call never got a response.
    #[error("refresh call failed: {0}")]
    Transport(TransportError),

    /// The refresh call exceeded its time budget.
    #[error("refresh call timed out after {timeout_ms} ms")]
    Timeout {
        /// Budget that was exceeded.
        timeout_ms: u64,
    },

    /// The server answered with a non-2xx status.
    #[error("refresh rejected with status {status}")]
    Rejected {
        /// Status returned by the refresh endpoint.
        status: u16,
    },

    /// 2xx without a non-empty `access_token` field.
    #[error("refresh response did not contain an access token")]
    MissingToken,

    /// The session was cleared while the refresh was in flight.
    #[error("session ended while the refresh was in flight")]
    SessionEnded,

    /// The refresh task went away without publishing an outcome.
    #[error("refresh ended without an outcome")]
    Abandoned,
}

impl RefreshError {
    /// Returns true if this failure must end the session.
    #[must_use]
    pub const fn ends_session(&self) -> bool {
        !matches!(self, Self::SessionEnded)
    }
}

/// Errors from the login use case.
#[derive(Debug, Clone, Error)]
pub enum LoginError {
    /// Email or password was empty; nothing was sent.
    #[error("email and password are required")]
    MissingCredentials,

    /// The server rejected the credentials (401).
    #[error("{message}")]
    InvalidCredentials {
        /// Server-provided reason.
        message: String,
    },

    /// 2xx without an access token.
    #[error("login response did not contain an access token")]
    MissingToken,

    /// The body did not have the expected shape.
    #[error("unexpected login response: {0}")]
    InvalidResponse(String),

    /// Any other API failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}
