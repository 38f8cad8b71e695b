//! Single-flight access token refresh.
//!
//! However many requests fail with 401 at once, one refresh call is made.
//! Every caller that arrives while it is in flight subscribes to the same
//! outcome. The refresh runs on its own task so dropping a caller's future
//! never strands the others.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use roster_domain::ApiRequest;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{SessionTeardown, TokenStore};
use crate::error::RefreshError;
use crate::ports::HttpTransport;

/// Result of a refresh wave, shared by all of its waiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The store now holds this token.
    Success(String),
    /// No usable token; teardown has already run unless the cause is
    /// `SessionEnded` or `Abandoned`.
    Failure(RefreshError),
}

impl RefreshOutcome {
    /// The new token, if the refresh succeeded.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Success(token) => Some(token),
            Self::Failure(_) => None,
        }
    }
}

type OutcomeReceiver = watch::Receiver<Option<RefreshOutcome>>;

enum RefreshState {
    Idle,
    InFlight(OutcomeReceiver),
}

#[derive(Deserialize)]
struct RefreshBody {
    #[serde(default)]
    access_token: Option<String>,
}

/// Coordinates refreshes so that at most one refresh call is in flight.
pub struct RefreshCoordinator<T> {
    inner: Arc<CoordinatorInner<T>>,
}

impl<T> Clone for RefreshCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<T> {
    transport: Arc<T>,
    store: TokenStore,
    teardown: SessionTeardown<T>,
    refresh_url: String,
    timeout: Duration,
    state: Mutex<RefreshState>,
    waves: AtomicU64,
}

impl<T: HttpTransport + 'static> RefreshCoordinator<T> {
    /// Creates a coordinator for the given refresh endpoint.
    pub fn new(
        transport: Arc<T>,
        store: TokenStore,
        teardown: SessionTeardown<T>,
        refresh_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                transport,
                store,
                teardown,
                refresh_url: refresh_url.into(),
                timeout,
                state: Mutex::new(RefreshState::Idle),
                waves: AtomicU64::new(0),
            }),
        }
    }

    /// Obtains a fresh access token, joining the refresh in flight if any.
    ///
    /// By the time this resolves with `Success`, the store already holds the
    /// new token. By the time it resolves with a session-ending `Failure`,
    /// the store has already been cleared.
    pub async fn ensure_fresh_token(&self) -> RefreshOutcome {
        let mut outcome = self.join_or_start();
        match outcome.wait_for(Option::is_some).await {
            Ok(published) => published
                .clone()
                .unwrap_or(RefreshOutcome::Failure(RefreshError::Abandoned)),
            Err(_) => {
                warn!("refresh task ended without an outcome");
                RefreshOutcome::Failure(RefreshError::Abandoned)
            }
        }
    }

    /// Returns true while a refresh call is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.state.lock(), RefreshState::InFlight(_))
    }

    /// Number of refresh waves started so far.
    #[must_use]
    pub fn waves_started(&self) -> u64 {
        self.inner.waves.load(Ordering::Relaxed)
    }

    fn join_or_start(&self) -> OutcomeReceiver {
        let mut state = self.inner.state.lock();
        if let RefreshState::InFlight(rx) = &*state {
            // A closed channel means the task vanished; start over.
            if rx.has_changed().is_ok() {
                return rx.clone();
            }
        }

        let (tx, rx) = watch::channel(None);
        *state = RefreshState::InFlight(rx.clone());
        drop(state);

        let wave = self.inner.waves.fetch_add(1, Ordering::Relaxed) + 1;
        let epoch = self.inner.store.epoch();
        debug!(wave, epoch, "starting token refresh");
        tokio::spawn(Arc::clone(&self.inner).run(wave, epoch, tx));
        rx
    }
}

impl<T: HttpTransport + 'static> CoordinatorInner<T> {
    async fn run(
        self: Arc<Self>,
        wave: u64,
        epoch: u64,
        tx: watch::Sender<Option<RefreshOutcome>>,
    ) {
        let outcome = match self.request_token().await {
            Ok(token) => {
                if self.store.update_access_token(epoch, token.as_str()).await {
                    info!(wave, "access token refreshed");
                    RefreshOutcome::Success(token)
                } else {
                    info!(wave, "session changed during refresh; discarding token");
                    RefreshOutcome::Failure(RefreshError::SessionEnded)
                }
            }
            Err(cause) => {
                warn!(wave, error = %cause, "token refresh failed");
                self.teardown.execute(&cause).await;
                RefreshOutcome::Failure(cause)
            }
        };

        *self.state.lock() = RefreshState::Idle;
        tx.send_replace(Some(outcome));
    }

    async fn request_token(&self) -> Result<String, RefreshError> {
        let request = ApiRequest::post_json(self.refresh_url.as_str(), serde_json::json!({}))
            .with_timeout(self.timeout);
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);

        let response = match tokio::time::timeout(self.timeout, self.transport.send(&request)).await
        {
            Err(_) => return Err(RefreshError::Timeout { timeout_ms }),
            Ok(Err(e)) => return Err(RefreshError::Transport(e)),
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        let body: RefreshBody = response
            .json_body()
            .map_err(|_| RefreshError::MissingToken)?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or(RefreshError::MissingToken)
    }
}
