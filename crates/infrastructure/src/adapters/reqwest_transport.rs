//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. It keeps a cookie jar
//! so the HTTP-only refresh cookie set at login travels with the refresh
//! call, and never looks at the status code it receives.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, Url};
use roster_application::ports::{HttpTransport, TransportError};
use roster_domain::{ApiRequest, ApiResponse, HttpMethod};

const MAX_REDIRECTS: usize = 10;

/// HTTP transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport with a cookie store and the given defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(user_agent: &str, default_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// Creates a transport around a preconfigured reqwest client.
    #[must_use]
    pub const fn with_client(client: Client, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }

        let host = || {
            error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string()
        };

        if error.is_connect() {
            let message = error.to_string();
            let lower = message.to_lowercase();
            if lower.contains("dns") || lower.contains("resolve") {
                return TransportError::DnsError {
                    host: host(),
                    message,
                };
            }
            if lower.contains("refused") {
                return TransportError::ConnectionRefused {
                    host: host(),
                    port: error
                        .url()
                        .and_then(Url::port_or_known_default)
                        .unwrap_or(80),
                };
            }
            return TransportError::ConnectionFailed(message);
        }

        if error.is_builder() {
            return TransportError::InvalidUrl(error.to_string());
        }

        TransportError::Other(error.to_string())
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{e}: {}", request.url)))?;
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(timeout);

        for header in request.headers.iter() {
            builder = builder.header(&header.name, &header.value);
        }

        if let Some(content_type) = request.body.content_type()
            && !request.headers.contains("content-type")
        {
            builder = builder.header("Content-Type", content_type);
        }

        if !request.body.is_none() {
            builder = builder.body(request.body.to_bytes());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        let status = response.status().as_u16();

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?
            .to_vec();

        Ok(ApiResponse::new(status, headers, body, start.elapsed()))
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.execute(request).await
    }
}
