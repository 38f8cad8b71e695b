//! Observable, persisted holder of the live session.
//!
//! The session lives in a `tokio::sync::watch` channel: reads are
//! non-blocking borrows, and every mutation is visible to readers and
//! subscribers before the mutating call reaches its first `.await`.
//! Persistence happens after that and never rolls the in-memory state back.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use roster_domain::{Identity, Session, token_preview};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::ports::SessionRepository;

/// Thread-safe handle to the process-wide session.
///
/// Cloning the handle is cheap; all clones share one session.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

struct Inner {
    session: watch::Sender<Session>,
    repository: Arc<dyn SessionRepository>,
    /// Bumped by every login and logout, under the channel's write lock.
    epoch: AtomicU64,
    /// Serializes writes so the file always ends with the latest snapshot.
    persist_lock: Mutex<()>,
}

impl TokenStore {
    /// Creates an unauthenticated store backed by `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self::with_session(repository, Session::empty())
    }

    /// Creates a store holding the session found in `repository`.
    ///
    /// A missing or unreadable session yields an unauthenticated store.
    pub async fn restore(repository: Arc<dyn SessionRepository>) -> Self {
        let session = match repository.load().await {
            Ok(Some(session)) if session.is_authenticated() => {
                info!(
                    user_id = session.identity.as_ref().map(|i| i.id),
                    token = %session.token_preview(),
                    "restored persisted session"
                );
                session
            }
            Ok(_) => Session::empty(),
            Err(e) => {
                warn!(error = %e, "could not read persisted session; starting signed out");
                Session::empty()
            }
        };
        Self::with_session(repository, session)
    }

    fn with_session(repository: Arc<dyn SessionRepository>, session: Session) -> Self {
        let (session, _) = watch::channel(session);
        Self {
            inner: Arc::new(Inner {
                session,
                repository,
                epoch: AtomicU64::new(0),
                persist_lock: Mutex::new(()),
            }),
        }
    }

    /// Returns the current access token, empty when unauthenticated.
    #[must_use]
    pub fn access_token(&self) -> String {
        self.inner.session.borrow().access_token.clone()
    }

    /// Returns a snapshot of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    /// Returns the signed-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.session.borrow().identity.clone()
    }

    /// Returns true when a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.borrow().is_authenticated()
    }

    /// Identifies the current session.
    ///
    /// Changes on `set_session` and `clear`, never on a token update.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        let _session = self.inner.session.borrow();
        self.inner.epoch.load(Ordering::Acquire)
    }

    /// Subscribes to session changes.
    ///
    /// The receiver starts at the current session and is marked changed
    /// by every later mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    /// Replaces the whole session after a login and persists it.
    pub async fn set_session(&self, identity: Identity, access_token: impl Into<String>) {
        let session = Session::new(identity, access_token);
        info!(token = %session.token_preview(), "session established");
        self.replace(session);
        self.persist().await;
    }

    /// Replaces only the access token, keeping the identity.
    ///
    /// `epoch` is the value of [`Self::epoch`] when the refresh started.
    /// Returns `false` without changing anything when a login or logout
    /// happened since, so a late refresh cannot revive an ended session or
    /// overwrite a newer one. A store nobody signed in to accepts the token.
    pub async fn update_access_token(&self, epoch: u64, access_token: impl Into<String>) -> bool {
        let access_token = access_token.into();
        let preview = token_preview(&access_token);
        let applied = self.inner.session.send_if_modified(|session| {
            if self.inner.epoch.load(Ordering::Acquire) != epoch {
                return false;
            }
            session.access_token = access_token;
            true
        });

        if applied {
            debug!(token = %preview, "access token replaced");
            self.persist().await;
        }
        applied
    }

    /// Resets to the unauthenticated session and removes it from storage.
    pub async fn clear(&self) {
        self.replace(Session::empty());
        info!("session cleared");
        self.persist().await;
    }

    fn replace(&self, session: Session) {
        self.inner.session.send_modify(|current| {
            self.inner.epoch.fetch_add(1, Ordering::AcqRel);
            *current = session;
        });
    }

    async fn persist(&self) {
        let _guard = self.inner.persist_lock.lock().await;
        let snapshot = self.session();
        let result = if snapshot.is_authenticated() {
            self.inner.repository.save(&snapshot).await
        } else {
            self.inner.repository.clear().await
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session");
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.session.borrow();
        f.debug_struct("TokenStore")
            .field("authenticated", &session.is_authenticated())
            .field("token", &session.token_preview())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::{MemorySessionRepository, sample_identity};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_set_session_persists() {
        let repository = Arc::new(MemorySessionRepository::new());
        let store = TokenStore::new(repository.clone());

        store.set_session(sample_identity(), "T1").await;

        assert_eq!(store.access_token(), "T1");
        assert!(store.is_authenticated());
        assert_eq!(repository.stored().unwrap().access_token, "T1");
    }

    #[tokio::test]
    async fn test_update_access_token_keeps_identity() {
        let repository = Arc::new(MemorySessionRepository::new());
        let store = TokenStore::new(repository.clone());
        store.set_session(sample_identity(), "T1").await;

        assert!(store.update_access_token(store.epoch(), "T2").await);

        assert_eq!(store.access_token(), "T2");
        assert_eq!(store.identity(), Some(sample_identity()));
        assert_eq!(repository.stored().unwrap().access_token, "T2");
    }

    #[tokio::test]
    async fn test_update_after_clear_is_ignored() {
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        store.set_session(sample_identity(), "T1").await;
        let epoch = store.epoch();
        store.clear().await;

        assert!(!store.update_access_token(epoch, "T2").await);
        assert_eq!(store.access_token(), "");
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_update_after_new_login_is_ignored() {
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        store.set_session(sample_identity(), "T1").await;
        let epoch = store.epoch();
        store.set_session(sample_identity(), "L2").await;

        assert!(!store.update_access_token(epoch, "T2").await);
        assert_eq!(store.access_token(), "L2");
    }

    #[tokio::test]
    async fn test_update_without_identity_keeps_token_in_memory() {
        let repository = Arc::new(MemorySessionRepository::new());
        let store = TokenStore::new(repository.clone());

        assert!(store.update_access_token(store.epoch(), "T2").await);

        assert_eq!(store.access_token(), "T2");
        assert!(!store.is_authenticated());
        assert!(repository.stored().is_none());
    }

    #[tokio::test]
    async fn test_token_update_keeps_epoch() {
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        store.set_session(sample_identity(), "T1").await;
        let epoch = store.epoch();

        assert!(store.update_access_token(epoch, "T2").await);
        assert!(store.update_access_token(epoch, "T3").await);
        assert_eq!(store.epoch(), epoch);
        assert_eq!(store.access_token(), "T3");
    }

    #[tokio::test]
    async fn test_clear_removes_stored_session() {
        let repository = Arc::new(MemorySessionRepository::new());
        let store = TokenStore::new(repository.clone());
        store.set_session(sample_identity(), "T1").await;

        store.clear().await;

        assert_eq!(store.session(), Session::empty());
        assert!(repository.stored().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mutation() {
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.set_session(sample_identity(), "T1").await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().access_token, "T1");

        store.clear().await;
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_loads_persisted_session() {
        let repository = Arc::new(MemorySessionRepository::with_session(Session::new(
            sample_identity(),
            "T1",
        )));

        let store = TokenStore::restore(repository).await;

        assert_eq!(store.access_token(), "T1");
        assert_eq!(store.identity().unwrap().email, "member@example.com");
    }

    #[tokio::test]
    async fn test_restore_survives_broken_storage() {
        let repository = Arc::new(MemorySessionRepository::new());
        repository.fail_io(true);

        let store = TokenStore::restore(repository).await;

        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_roll_back_memory() {
        let repository = Arc::new(MemorySessionRepository::new());
        let store = TokenStore::new(repository.clone());
        repository.fail_io(true);

        store.set_session(sample_identity(), "T1").await;

        assert_eq!(store.access_token(), "T1");
    }

    #[test]
    fn test_debug_does_not_print_token() {
        let store = TokenStore::new(Arc::new(MemorySessionRepository::new()));
        let rendered = format!("{store:?}");
        assert!(rendered.contains("authenticated: false"));
    }
}
