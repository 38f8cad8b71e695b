//! The authenticated request pipeline.
//!
//! Every call is signed with the current token. A 401 from a protected
//! endpoint triggers one shared refresh and exactly one resend; a second 401
//! is surfaced to the caller. Login and refresh endpoints never trigger a
//! refresh.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use roster_domain::{
    ApiRequest, ApiResponse, AuthEndpoints, ClientSettings, DomainResult, HttpMethod, Notice,
    RequestBody,
};
use tracing::{debug, info};

use super::{RefreshCoordinator, RefreshOutcome, SessionSinks, SessionTeardown, TokenStore, sign};
use crate::error::{ApiError, ApiResult};
use crate::ports::HttpTransport;

/// Default login route for redirects.
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Default refresh budget.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Static configuration of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Auth endpoints and the base URL.
    pub endpoints: AuthEndpoints,
    /// Route the UI is sent to when the session ends.
    pub login_route: String,
    /// Timeout applied to requests that do not set their own.
    pub request_timeout: Option<Duration>,
    /// Timeout of the refresh call.
    pub refresh_timeout: Duration,
}

impl PipelineConfig {
    /// Configuration with default routes and timeouts.
    #[must_use]
    pub fn new(endpoints: AuthEndpoints) -> Self {
        Self {
            endpoints,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            request_timeout: None,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Builds the configuration from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or an auth path is invalid.
    pub fn from_settings(settings: &ClientSettings) -> DomainResult<Self> {
        Ok(Self {
            endpoints: AuthEndpoints::from_settings(settings)?,
            login_route: settings.login_route.clone(),
            request_timeout: Some(settings.request_timeout()),
            refresh_timeout: settings.refresh_timeout(),
        })
    }
}

/// HTTP client that signs requests and recovers from expired tokens.
pub struct AuthenticatedClient<T> {
    transport: Arc<T>,
    store: TokenStore,
    config: PipelineConfig,
    coordinator: RefreshCoordinator<T>,
    teardown: SessionTeardown<T>,
    sinks: SessionSinks,
}

impl<T> fmt::Debug for AuthenticatedClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.config.endpoints.base_url().as_str())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport + 'static> AuthenticatedClient<T> {
    /// Wires the pipeline: refresh coordinator and teardown share the store.
    pub fn new(
        transport: Arc<T>,
        store: TokenStore,
        config: PipelineConfig,
        sinks: SessionSinks,
    ) -> Self {
        let teardown = SessionTeardown::new(
            Arc::clone(&transport),
            store.clone(),
            sinks.clone(),
            config.endpoints.logout_url(),
            config.login_route.clone(),
            config.refresh_timeout,
        );
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            store.clone(),
            teardown.clone(),
            config.endpoints.refresh_url(),
            config.refresh_timeout,
        );
        Self {
            transport,
            store,
            config,
            coordinator,
            teardown,
            sinks,
        }
    }

    /// Sends a request through the full pipeline.
    ///
    /// # Errors
    ///
    /// - `ApiError::Unauthorized` when the 401 could not be recovered
    /// - `ApiError::Forbidden` for a 403 (a notice is emitted)
    /// - `ApiError::Status` for any other non-success status
    /// - `ApiError::Transport` when no response was received
    pub async fn request(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let request = self.with_default_timeout(request);
        let signed_with = self.store.access_token();
        let response = self.dispatch(&request, &signed_with).await?;

        if !response.status_code().is_unauthorized()
            || self.config.endpoints.is_exempt(&request.url)
        {
            return self.classify(response);
        }
        if request.is_retry() {
            return Err(ApiError::Unauthorized(response));
        }

        let retry = request.to_retry();
        let current = self.store.access_token();
        if !current.is_empty() && current != signed_with {
            debug!(id = %request.id, "token changed while in flight; resending");
            let response = self.dispatch(&retry, &current).await?;
            return self.classify(response);
        }

        match self.coordinator.ensure_fresh_token().await {
            RefreshOutcome::Success(token) => {
                let response = self.dispatch(&retry, &token).await?;
                self.classify(response)
            }
            RefreshOutcome::Failure(cause) => {
                debug!(id = %request.id, error = %cause, "refresh failed; surfacing 401");
                Err(ApiError::Unauthorized(response))
            }
        }
    }

    /// Sends a request without a bearer token and without refresh handling.
    ///
    /// Used for login, where a stale token must not be presented.
    ///
    /// # Errors
    ///
    /// Same classification as [`Self::request`].
    pub async fn send_unsigned(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let request = self.with_default_timeout(request);
        let response = self.dispatch(&request, "").await?;
        self.classify(response)
    }

    /// Sends a signed request once and returns whatever the server answered.
    ///
    /// No refresh, no status classification and no notices; the caller
    /// inspects the status itself.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` when no response was received.
    pub async fn send_once(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let request = self.with_default_timeout(request);
        let token = self.store.access_token();
        self.dispatch(&request, &token).await
    }

    /// Waits for background work started by a session teardown.
    ///
    /// Call before the runtime shuts down so the server logout is not lost.
    /// Bounded by the refresh timeout.
    pub async fn shutdown(&self) {
        self.teardown.flush().await;
    }

    /// GET `path` relative to the base URL.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(ApiRequest::new(HttpMethod::Get, self.resolve(path)))
            .await
    }

    /// POST a JSON body to `path`.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn post(&self, path: &str, body: serde_json::Value) -> ApiResult<ApiResponse> {
        self.request(
            ApiRequest::new(HttpMethod::Post, self.resolve(path))
                .with_body(RequestBody::json(body)),
        )
        .await
    }

    /// PUT a JSON body to `path`.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn put(&self, path: &str, body: serde_json::Value) -> ApiResult<ApiResponse> {
        self.request(
            ApiRequest::new(HttpMethod::Put, self.resolve(path))
                .with_body(RequestBody::json(body)),
        )
        .await
    }

    /// PATCH a JSON body to `path`.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn patch(&self, path: &str, body: serde_json::Value) -> ApiResult<ApiResponse> {
        self.request(
            ApiRequest::new(HttpMethod::Patch, self.resolve(path))
                .with_body(RequestBody::json(body)),
        )
        .await
    }

    /// DELETE `path`.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(ApiRequest::new(HttpMethod::Delete, self.resolve(path)))
            .await
    }

    /// The shared session store.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Auth endpoints and base URL.
    #[must_use]
    pub const fn endpoints(&self) -> &AuthEndpoints {
        &self.config.endpoints
    }

    /// Notification and navigation sinks.
    #[must_use]
    pub const fn sinks(&self) -> &SessionSinks {
        &self.sinks
    }

    /// Route used for login redirects.
    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.config.login_route
    }

    /// Sends the UI to the login route.
    pub fn navigate_to_login(&self) {
        self.sinks.navigator.navigate(&self.config.login_route);
    }

    fn resolve(&self, path: &str) -> String {
        self.config.endpoints.resolve(path)
    }

    fn with_default_timeout(&self, request: ApiRequest) -> ApiRequest {
        match (request.timeout, self.config.request_timeout) {
            (None, Some(timeout)) => request.with_timeout(timeout),
            _ => request,
        }
    }

    async fn dispatch(&self, request: &ApiRequest, token: &str) -> ApiResult<ApiResponse> {
        let signed = sign(request, token);
        debug!(
            id = %signed.id,
            method = %signed.method,
            url = %signed.url,
            attempt = ?signed.attempt,
            "sending request"
        );
        let response = self.transport.send(&signed).await?;
        debug!(
            id = %signed.id,
            status = response.status,
            elapsed = %response.duration_display(),
            "received response"
        );
        Ok(response)
    }

    fn classify(&self, response: ApiResponse) -> ApiResult<ApiResponse> {
        let status = response.status_code();
        if status.is_success() || status.is_redirection() {
            Ok(response)
        } else if status.is_unauthorized() {
            Err(ApiError::Unauthorized(response))
        } else if status.is_forbidden() {
            info!("request forbidden");
            self.sinks.notifier.notify(Notice::permission_denied());
            Err(ApiError::Forbidden(response))
        } else {
            Err(ApiError::Status(response))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::TransportError;
    use crate::testing::{
        MemorySessionRepository, RecordingNavigator, RecordingNotifier, Reply, ScriptedTransport,
        recording_sinks, sample_identity,
    };
    use pretty_assertions::assert_eq;
    use roster_domain::{Attempt, NoticeKind};
    use serde_json::json;
    use tokio::task::JoinSet;

    const BASE: &str = "https://api.example.com";
    const REFRESH: &str = "https://api.example.com/auth/refresh_token";
    const LOGIN: &str = "https://api.example.com/auth/login";
    const LOGOUT: &str = "https://api.example.com/auth/logout";
    const DASHBOARD: &str = "https://api.example.com/api/members/dashboard/";

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        client: Arc<AuthenticatedClient<ScriptedTransport>>,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<RecordingNavigator>,
    }

    impl Fixture {
        fn store(&self) -> &TokenStore {
            self.client.store()
        }
    }

    async fn fixture(transport: ScriptedTransport) -> Fixture {
        let transport = Arc::new(transport);
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        store.set_session(sample_identity(), "T1").await;
        let (sinks, notifier, navigator) = recording_sinks();
        let endpoints =
            AuthEndpoints::new(BASE, "/auth/login", "/auth/refresh_token", "/auth/logout")
                .unwrap();
        let client = AuthenticatedClient::new(
            transport.clone(),
            store,
            PipelineConfig::new(endpoints),
            sinks,
        );
        Fixture {
            transport,
            client: Arc::new(client),
            notifier,
            navigator,
        }
    }

    /// Server that accepts only `valid` and refreshes to `valid`.
    fn server(valid: &'static str, refresh_delay: Duration) -> ScriptedTransport {
        ScriptedTransport::new(move |request| {
            if request.url == REFRESH {
                return Reply::json(200, json!({ "access_token": valid })).after(refresh_delay);
            }
            if request.url == LOGOUT {
                return Reply::status(200);
            }
            if request.authorization() == Some(format!("Bearer {valid}").as_str()) {
                Reply::json(200, json!({ "ok": true }))
            } else {
                Reply::json(401, json!({ "detail": "token_not_valid" }))
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_token_passes_through() {
        let f = fixture(server("T1", Duration::ZERO)).await;

        let response = f.client.get("/api/members/dashboard/").await.unwrap();

        assert_eq!(response.status, 200);
        let calls = f.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, DASHBOARD);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer T1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_token_is_refreshed_and_retried() {
        let f = fixture(server("T2", Duration::ZERO)).await;

        let response = f.client.get("/api/members/dashboard/").await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(f.store().access_token(), "T2");
        let calls = f.transport.calls_to(DASHBOARD);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer T1"));
        assert_eq!(calls[1].authorization.as_deref(), Some("Bearer T2"));
        assert_eq!(calls[1].attempt, Attempt::Retry);
        assert_eq!(f.transport.calls_to(REFRESH).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_401s_share_one_refresh() {
        let f = fixture(server("T2", Duration::from_millis(50))).await;

        let mut requests = JoinSet::new();
        for path in ["/api/a/", "/api/b/", "/api/c/"] {
            let client = Arc::clone(&f.client);
            requests.spawn(async move { client.get(path).await });
        }
        let results = requests.join_all().await;

        assert_eq!(f.transport.calls_to(REFRESH).len(), 1);
        for result in results {
            assert_eq!(result.unwrap().status, 200);
        }
        for path in ["/api/a/", "/api/b/", "/api/c/"] {
            let calls = f.transport.calls_to(&format!("{BASE}{path}"));
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[1].authorization.as_deref(), Some("Bearer T2"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_401_is_not_retried_again() {
        let f = fixture(ScriptedTransport::new(|request| {
            if request.url == REFRESH {
                Reply::json(200, json!({ "access_token": "T2" }))
            } else {
                Reply::status(401)
            }
        }))
        .await;

        let error = f.client.get("/api/members/dashboard/").await.unwrap_err();

        assert!(error.is_unauthorized());
        assert_eq!(f.transport.calls_to(DASHBOARD).len(), 2);
        assert_eq!(f.transport.calls_to(REFRESH).len(), 1);
        assert_eq!(f.store().access_token(), "T2");
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_surfaces_original_401() {
        let f = fixture(ScriptedTransport::new(|request| {
            if request.url == LOGOUT {
                Reply::status(200)
            } else {
                Reply::json(401, json!({ "detail": "expired" }))
            }
        }))
        .await;

        let error = f.client.get("/api/members/dashboard/").await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let response = error.response().unwrap();
        assert!(error.is_unauthorized());
        assert_eq!(response.text(), r#"{"detail":"expired"}"#);
        assert!(!f.store().is_authenticated());
        assert_eq!(f.transport.calls_to(DASHBOARD).len(), 1);
        assert_eq!(f.transport.calls_to(LOGOUT).len(), 1);
        assert_eq!(f.notifier.count(NoticeKind::SessionExpired), 1);
        assert_eq!(f.navigator.routes(), vec!["/login".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_notify_once() {
        let f = fixture(ScriptedTransport::new(|request| {
            if request.url == REFRESH {
                Reply::status(401).after(Duration::from_millis(50))
            } else {
                Reply::status(401)
            }
        }))
        .await;

        let mut requests = JoinSet::new();
        for path in ["/api/a/", "/api/b/", "/api/c/", "/api/d/"] {
            let client = Arc::clone(&f.client);
            requests.spawn(async move { client.get(path).await });
        }
        let results = requests.join_all().await;

        assert!(results.iter().all(|r| matches!(r, Err(ApiError::Unauthorized(_)))));
        assert_eq!(f.transport.calls_to(REFRESH).len(), 1);
        assert_eq!(f.notifier.count(NoticeKind::SessionExpired), 1);
        assert_eq!(f.navigator.routes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_401_never_refreshes() {
        let f = fixture(ScriptedTransport::new(|request| {
            if request.url == LOGIN {
                Reply::json(401, json!({ "error": "Invalid email or password." }))
            } else {
                Reply::status(200)
            }
        }))
        .await;
        let request = ApiRequest::post_json(LOGIN, json!({ "email": "a", "password": "b" }));

        let error = f.client.request(request).await.unwrap_err();

        assert!(error.is_unauthorized());
        assert_eq!(f.transport.calls_to(REFRESH).len(), 0);
        assert_eq!(f.store().access_token(), "T1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_endpoint_401_never_recurses() {
        let f = fixture(ScriptedTransport::new(|_| Reply::status(401))).await;

        let error = f
            .client
            .request(ApiRequest::post_json(REFRESH, json!({})))
            .await
            .unwrap_err();

        assert!(error.is_unauthorized());
        assert_eq!(f.transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookalike_path_is_not_exempt() {
        let f = fixture(server("T2", Duration::ZERO)).await;

        let response = f.client.get("/api/auth/login-history/").await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(f.transport.calls_to(REFRESH).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_keeps_session() {
        let f = fixture(ScriptedTransport::new(|_| Reply::status(403))).await;

        let error = f.client.delete("/api/manager/members/3/").await.unwrap_err();

        assert!(matches!(error, ApiError::Forbidden(_)));
        assert_eq!(f.transport.calls().len(), 1);
        assert_eq!(f.store().access_token(), "T1");
        assert!(f.store().is_authenticated());
        assert_eq!(f.notifier.count(NoticeKind::PermissionDenied), 1);
        assert_eq!(f.notifier.count(NoticeKind::SessionExpired), 0);
        assert!(f.navigator.routes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_statuses_pass_through() {
        let f = fixture(ScriptedTransport::new(|_| Reply::status(500))).await;

        let error = f.client.get("/api/members/").await.unwrap_err();

        assert_eq!(error.status(), Some(500));
        assert!(matches!(error, ApiError::Status(_)));
        assert_eq!(f.transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_an_auth_failure() {
        let f = fixture(ScriptedTransport::new(|_| {
            Reply::error(TransportError::ConnectionRefused {
                host: "api.example.com".to_string(),
                port: 443,
            })
        }))
        .await;

        let error = f.client.get("/api/members/").await.unwrap_err();

        assert!(matches!(error, ApiError::Transport(_)));
        assert!(f.store().is_authenticated());
        assert_eq!(f.transport.calls_to(REFRESH).len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_token_retries_without_refresh() {
        // The first request is slow; a refresh completes while it is in flight.
        let f = fixture(ScriptedTransport::new(|request| {
            if request.url == REFRESH {
                return Reply::json(200, json!({ "access_token": "T2" }));
            }
            match (request.url.as_str(), request.authorization()) {
                (_, Some("Bearer T2")) => Reply::status(200),
                (DASHBOARD, _) => Reply::status(401).after(Duration::from_millis(100)),
                _ => Reply::status(401),
            }
        }))
        .await;

        let slow = {
            let client = Arc::clone(&f.client);
            tokio::spawn(async move { client.get("/api/members/dashboard/").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.client.get("/api/members/").await.unwrap();
        let response = slow.await.unwrap().unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(f.transport.calls_to(REFRESH).len(), 1);
        let calls = f.transport.calls_to(DASHBOARD);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].authorization.as_deref(), Some("Bearer T2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_after_refresh_uses_new_token() {
        let f = fixture(server("T2", Duration::ZERO)).await;
        f.client.get("/api/a/").await.unwrap();

        f.client.get("/api/b/").await.unwrap();

        let calls = f.transport.calls_to(&format!("{BASE}/api/b/"));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer T2"));
        assert_eq!(f.transport.calls_to(REFRESH).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_unsigned_omits_bearer() {
        let f = fixture(ScriptedTransport::new(|_| Reply::status(200))).await;

        f.client
            .send_unsigned(ApiRequest::post_json(LOGIN, json!({})))
            .await
            .unwrap();

        assert_eq!(f.transport.calls()[0].authorization, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_out_store_still_refreshes_and_retries() {
        let f = fixture(server("T2", Duration::ZERO)).await;
        f.store().clear().await;

        let response = f.client.get("/api/members/dashboard/").await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(f.store().access_token(), "T2");
        let calls = f.transport.calls_to(DASHBOARD);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].authorization, None);
        assert_eq!(calls[1].authorization.as_deref(), Some("Bearer T2"));
        assert!(f.notifier.notices().is_empty());
        assert!(f.navigator.routes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_once_reports_status_without_notice() {
        let f = fixture(ScriptedTransport::new(|_| Reply::status(403))).await;

        let response = f
            .client
            .send_once(ApiRequest::post_json(LOGOUT, json!({})))
            .await
            .unwrap();

        assert_eq!(response.status, 403);
        assert!(f.notifier.notices().is_empty());
        assert_eq!(f.transport.calls()[0].authorization.as_deref(), Some("Bearer T1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_teardown_logout() {
        let f = fixture(ScriptedTransport::new(|request| {
            if request.url == LOGOUT {
                Reply::status(200).after(Duration::from_millis(500))
            } else {
                Reply::status(401)
            }
        }))
        .await;

        let started = tokio::time::Instant::now();
        f.client.get("/api/members/dashboard/").await.unwrap_err();
        f.client.shutdown().await;

        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(f.transport.calls_to(LOGOUT).len(), 1);
    }
}
