//! Request specification type

use std::time::Duration;

use url::Url;
use uuid::Uuid;

use super::{Headers, HttpMethod, RequestBody};

/// Which attempt of an originating request a value represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attempt {
    /// First dispatch.
    #[default]
    Initial,
    /// The single resend after an authorization failure.
    Retry,
}

/// Complete specification for an API request.
///
/// Values are treated as immutable: signing and retrying produce new
/// values rather than editing a request that a caller may still hold.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Correlation id, shared by an originating request and its retry
    pub id: Uuid,
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute target URL
    pub url: String,
    /// HTTP headers
    pub headers: Headers,
    /// Request body
    pub body: RequestBody,
    /// Per-request timeout; the transport default applies when `None`
    pub timeout: Option<Duration>,
    /// Initial dispatch or retry
    pub attempt: Attempt,
}

impl ApiRequest {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            method,
            url: url.into(),
            headers: Headers::new(),
            body: RequestBody::None,
            timeout: None,
            attempt: Attempt::Initial,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, url).with_body(RequestBody::json(body))
    }

    /// Returns this request with an extra header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Returns this request with the given body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Returns this request with a timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns true if this value is the resend of an earlier attempt.
    #[must_use]
    pub const fn is_retry(&self) -> bool {
        matches!(self.attempt, Attempt::Retry)
    }

    /// Returns the retry of this request: same id, method, URL and body.
    #[must_use]
    pub fn to_retry(&self) -> Self {
        Self {
            attempt: Attempt::Retry,
            ..self.clone()
        }
    }

    /// Returns the `Authorization` header value, if any.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("Authorization")
    }

    /// Validates the URL and returns the parsed version if valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn parse_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.url)
    }
}
