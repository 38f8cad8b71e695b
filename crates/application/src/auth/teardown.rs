//! Ending a session that can no longer be refreshed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use roster_domain::{ApiRequest, Notice};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::TokenStore;
use crate::error::RefreshError;
use crate::ports::{HttpTransport, NavigationSink, NotificationSink};

/// Where teardown and the client report to the user.
#[derive(Clone)]
pub struct SessionSinks {
    /// Receives notices such as "session expired".
    pub notifier: Arc<dyn NotificationSink>,
    /// Receives route changes.
    pub navigator: Arc<dyn NavigationSink>,
}

impl SessionSinks {
    /// Bundles a notifier and a navigator.
    pub fn new(notifier: Arc<dyn NotificationSink>, navigator: Arc<dyn NavigationSink>) -> Self {
        Self {
            notifier,
            navigator,
        }
    }
}

impl fmt::Debug for SessionSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSinks").finish_non_exhaustive()
    }
}

/// Clears the session, tells the server, the user and the router.
///
/// Clones share the set of pending server logout calls.
pub struct SessionTeardown<T> {
    transport: Arc<T>,
    store: TokenStore,
    sinks: SessionSinks,
    logout_url: String,
    login_route: String,
    logout_timeout: Duration,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl<T> Clone for SessionTeardown<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: self.store.clone(),
            sinks: self.sinks.clone(),
            logout_url: self.logout_url.clone(),
            login_route: self.login_route.clone(),
            logout_timeout: self.logout_timeout,
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: HttpTransport + 'static> SessionTeardown<T> {
    /// Creates a teardown bound to the given logout endpoint and login route.
    pub fn new(
        transport: Arc<T>,
        store: TokenStore,
        sinks: SessionSinks,
        logout_url: impl Into<String>,
        login_route: impl Into<String>,
        logout_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            sinks,
            logout_url: logout_url.into(),
            login_route: login_route.into(),
            logout_timeout,
            pending: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Ends the session after an unrecoverable refresh failure.
    ///
    /// The store is cleared first; the server call, notice and redirect
    /// follow and none of them depends on another succeeding.
    pub async fn execute(&self, reason: &RefreshError) {
        warn!(reason = %reason, "ending session");
        self.store.clear().await;

        self.spawn_server_logout();

        self.sinks.notifier.notify(Notice::session_expired());
        self.sinks.navigator.navigate(&self.login_route);
        info!(route = %self.login_route, "redirected to login");
    }

    /// Number of server logout calls not yet finished.
    #[must_use]
    pub fn pending_logouts(&self) -> usize {
        let mut pending = self.pending.lock();
        while pending.try_join_next().is_some() {}
        pending.len()
    }

    /// Waits for pending server logout calls, at most `logout_timeout`.
    ///
    /// Calls still running at the deadline are aborted.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock());
        if pending.is_empty() {
            return;
        }
        debug!(count = pending.len(), "waiting for server logout");
        let drained = tokio::time::timeout(self.logout_timeout, async {
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "server logout task failed");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                count = pending.len(),
                "server logout still running at shutdown; abandoning"
            );
        }
    }

    fn spawn_server_logout(&self) {
        let transport = Arc::clone(&self.transport);
        let request = ApiRequest::post_json(self.logout_url.as_str(), serde_json::json!({}))
            .with_timeout(self.logout_timeout);
        let timeout = self.logout_timeout;

        let mut pending = self.pending.lock();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match tokio::time::timeout(timeout, transport.send(&request)).await {
                Ok(Ok(response)) => {
                    debug!(status = response.status, "server logout completed");
                }
                Ok(Err(e)) => warn!(error = %e, "server logout failed"),
                Err(_) => warn!("server logout timed out"),
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::{
        MemorySessionRepository, Reply, ScriptedTransport, recording_sinks, sample_identity,
    };
    use crate::ports::TransportError;
    use pretty_assertions::assert_eq;
    use roster_domain::NoticeKind;

    const LOGOUT: &str = "https://api.example.com/auth/logout";

    #[tokio::test(start_paused = true)]
    async fn test_execute_clears_notifies_and_redirects() {
        let transport = Arc::new(ScriptedTransport::new(|_| Reply::status(200)));
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        store.set_session(sample_identity(), "T1").await;
        let (sinks, notifier, navigator) = recording_sinks();
        let teardown = SessionTeardown::new(
            transport.clone(),
            store.clone(),
            sinks,
            LOGOUT,
            "/login",
            Duration::from_secs(5),
        );

        teardown.execute(&RefreshError::Rejected { status: 401 }).await;

        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), "");
        assert_eq!(notifier.count(NoticeKind::SessionExpired), 1);
        assert_eq!(navigator.routes(), vec!["/login".to_string()]);

        tokio::time::sleep(Duration::from_millis(1)).await;
        let calls = transport.calls_to(LOGOUT);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].authorization, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_server_logout_is_ignored() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Reply::error(TransportError::ConnectionFailed("reset".to_string()))
        }));
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        store.set_session(sample_identity(), "T1").await;
        let (sinks, notifier, navigator) = recording_sinks();
        let teardown = SessionTeardown::new(
            transport.clone(),
            store.clone(),
            sinks,
            LOGOUT,
            "/login",
            Duration::from_secs(5),
        );

        teardown.execute(&RefreshError::MissingToken).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(!store.is_authenticated());
        assert_eq!(notifier.notices().len(), 1);
        assert_eq!(navigator.routes().len(), 1);
        assert_eq!(transport.calls_to(LOGOUT).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_server_logout() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Reply::status(200).after(Duration::from_millis(300))
        }));
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        store.set_session(sample_identity(), "T1").await;
        let (sinks, _, _) = recording_sinks();
        let teardown = SessionTeardown::new(
            transport.clone(),
            store,
            sinks,
            LOGOUT,
            "/login",
            Duration::from_secs(5),
        );

        let started = tokio::time::Instant::now();
        teardown.execute(&RefreshError::Rejected { status: 401 }).await;
        assert_eq!(teardown.pending_logouts(), 1);

        teardown.clone().flush().await;

        assert_eq!(teardown.pending_logouts(), 0);
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(transport.calls_to(LOGOUT).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_gives_up_after_logout_timeout() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Reply::status(200).after(Duration::from_secs(60))
        }));
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        let (sinks, _, _) = recording_sinks();
        let teardown = SessionTeardown::new(
            transport,
            store,
            sinks,
            LOGOUT,
            "/login",
            Duration::from_secs(2),
        );

        let started = tokio::time::Instant::now();
        teardown.execute(&RefreshError::MissingToken).await;
        teardown.flush().await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(teardown.pending_logouts(), 0);
    }
}
