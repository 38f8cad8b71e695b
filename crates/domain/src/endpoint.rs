//! API endpoint identity.
//!
//! All request URLs are built from one base URL. The login and refresh
//! endpoints are exempt from refresh-on-401; membership is decided by
//! exact route identity (scheme, host, port and path), never by substring.

use url::Url;

use crate::error::{DomainError, DomainResult};
use crate::settings::ClientSettings;

/// Resolved URLs of the authentication endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    base_url: Url,
    login: Url,
    refresh: Url,
    logout: Url,
}

impl AuthEndpoints {
    /// Builds the endpoint set from a base URL and the three auth paths.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the base URL is not an absolute
    /// http(s) URL or a path does not resolve against it.
    pub fn new(base_url: &str, login: &str, refresh: &str, logout: &str) -> DomainResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {base_url}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(DomainError::InvalidUrl(format!(
                "base URL must be http or https: {base_url}"
            )));
        }

        let resolve = |path: &str| {
            let joined = join(base.as_str(), path);
            Url::parse(&joined).map_err(|e| DomainError::InvalidUrl(format!("{e}: {joined}")))
        };

        Ok(Self {
            login: resolve(login)?,
            refresh: resolve(refresh)?,
            logout: resolve(logout)?,
            base_url: base,
        })
    }

    /// Builds the endpoint set from client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any URL is invalid.
    pub fn from_settings(settings: &ClientSettings) -> DomainResult<Self> {
        Self::new(
            &settings.base_url,
            &settings.login_path,
            &settings.refresh_path,
            &settings.logout_path,
        )
    }

    /// The base URL all paths are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Login endpoint.
    #[must_use]
    pub fn login_url(&self) -> &str {
        self.login.as_str()
    }

    /// Refresh endpoint.
    #[must_use]
    pub fn refresh_url(&self) -> &str {
        self.refresh.as_str()
    }

    /// Logout endpoint.
    #[must_use]
    pub fn logout_url(&self) -> &str {
        self.logout.as_str()
    }

    /// Resolves an API path against the base URL.
    ///
    /// Absolute http(s) URLs are returned unchanged.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            join(self.base_url.as_str(), path)
        }
    }

    /// Returns true if a 401 from `url` must be surfaced instead of
    /// triggering a refresh (login and refresh endpoints).
    #[must_use]
    pub fn is_exempt(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        same_route(&url, &self.login) || same_route(&url, &self.refresh)
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn same_route(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
        && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn endpoints() -> AuthEndpoints {
        AuthEndpoints::new(
            "http://127.0.0.1:8000/api",
            "/auth/login",
            "/auth/refresh_token",
            "/auth/logout",
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_paths() {
        let endpoints = endpoints();
        assert_eq!(
            endpoints.resolve("/members/dashboard/"),
            "http://127.0.0.1:8000/api/members/dashboard/"
        );
        assert_eq!(
            endpoints.refresh_url(),
            "http://127.0.0.1:8000/api/auth/refresh_token"
        );
        assert_eq!(endpoints.resolve("https://other/x"), "https://other/x");
    }

    #[test]
    fn test_exact_exemption() {
        let endpoints = endpoints();
        assert!(endpoints.is_exempt("http://127.0.0.1:8000/api/auth/login"));
        assert!(endpoints.is_exempt("http://127.0.0.1:8000/api/auth/login/"));
        assert!(endpoints.is_exempt("http://127.0.0.1:8000/api/auth/refresh_token?x=1"));
        assert!(!endpoints.is_exempt("http://127.0.0.1:8000/api/auth/logout"));
    }

    #[test]
    fn test_substring_lookalikes_are_not_exempt() {
        let endpoints = endpoints();
        assert!(!endpoints.is_exempt("http://127.0.0.1:8000/api/reports/login-history"));
        assert!(!endpoints.is_exempt("http://127.0.0.1:8000/api/users/login"));
        assert!(!endpoints.is_exempt("http://127.0.0.1:8000/api/auth/refresh_token/extra"));
        assert!(!endpoints.is_exempt("http://other-host:8000/api/auth/login"));
        assert!(!endpoints.is_exempt("not a url"));
    }

    #[test]
    fn test_rejects_non_http_base() {
        let result = AuthEndpoints::new("ftp://example.com", "/a", "/b", "/c");
        assert!(matches!(result, Err(DomainError::InvalidUrl(_))));
    }
}
