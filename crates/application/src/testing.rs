//! In-memory fakes for exercising the pipeline without a network.
//!
//! Available to this crate's tests and, through the `testing` feature, to
//! integration tests of downstream crates.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use roster_domain::{
    ApiRequest, ApiResponse, Attempt, HttpMethod, Identity, IdentityFlags, Notice, NoticeKind,
    Role, Session,
};

use crate::auth::SessionSinks;
use crate::ports::{
    HttpTransport, NavigationSink, NotificationSink, SessionRepository, StorageError,
    TransportError,
};

/// What a [`ScriptedTransport`] answers to one request.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Simulated network latency.
    pub delay: Duration,
    /// Response or transport failure.
    pub result: Result<ApiResponse, TransportError>,
}

impl Reply {
    /// A response with the given status and an empty JSON object body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::json(status, serde_json::json!({}))
    }

    /// A response with the given status and JSON body.
    #[must_use]
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(ApiResponse::json(status, &body)),
        }
    }

    /// A transport failure.
    #[must_use]
    pub fn error(error: TransportError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    /// Delivers this reply after `delay`.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// `Authorization` header, if any.
    pub authorization: Option<String>,
    /// Initial dispatch or retry.
    pub attempt: Attempt,
}

impl From<&ApiRequest> for RecordedCall {
    fn from(request: &ApiRequest) -> Self {
        Self {
            method: request.method,
            url: request.url.clone(),
            authorization: request.authorization().map(str::to_string),
            attempt: request.attempt,
        }
    }
}

type Handler = dyn Fn(&ApiRequest) -> Reply + Send + Sync;

/// Transport whose answers come from a closure; every call is recorded
/// when it is sent, in order.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Creates a transport answering with `handler`.
    pub fn new(handler: impl Fn(&ApiRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call sent so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Calls sent to exactly `url`.
    #[must_use]
    pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.url == url)
            .cloned()
            .collect()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        self.calls.lock().push(RecordedCall::from(request));
        let reply = (self.handler)(request);
        async move {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.result
        }
    }
}

/// Session repository kept in memory.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    session: Mutex<Option<Session>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemorySessionRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository that already holds `session`.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            ..Self::default()
        }
    }

    /// The stored session.
    #[must_use]
    pub fn stored(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    /// Makes every later operation fail with an I/O error.
    pub fn fail_io(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of save and clear calls received.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Io(std::io::Error::other("simulated storage failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        self.check()?;
        Ok(self.stored())
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        *self.session.lock() = None;
        Ok(())
    }
}

/// Notification sink that keeps every notice.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Notices received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Number of notices of `kind`.
    #[must_use]
    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices.lock().iter().filter(|n| n.kind == kind).count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Navigation sink that keeps every route.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Routes requested so far.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().clone()
    }
}

impl NavigationSink for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().push(route.to_string());
    }
}

/// Sinks backed by fresh recorders, plus handles to inspect them.
#[must_use]
pub fn recording_sinks() -> (SessionSinks, Arc<RecordingNotifier>, Arc<RecordingNavigator>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let sinks = SessionSinks::new(notifier.clone(), navigator.clone());
    (sinks, notifier, navigator)
}

/// A signed-in team member.
#[must_use]
pub fn sample_identity() -> Identity {
    Identity {
        id: 7,
        name: "Sam Member".to_string(),
        email: "member@example.com".to_string(),
        role: Role::Member,
        flags: IdentityFlags::default(),
    }
}
