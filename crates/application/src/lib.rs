//! Roster Application - Ports and the authenticated request pipeline
//!
//! This crate defines the application layer with:
//! - Port traits (transport, session storage, file system, UI sinks)
//! - The token store, request signer, refresh coordinator, session
//!   teardown and the authenticated client built from them
//! - Use cases for signing in and out

pub mod auth;
pub mod error;
pub mod ports;
pub mod use_cases;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use auth::{
    AuthenticatedClient, PipelineConfig, RefreshCoordinator, RefreshOutcome, SessionSinks,
    SessionTeardown, TokenStore, bearer, sign,
};
pub use error::{ApiError, ApiResult, LoginError, RefreshError};
pub use ports::{
    Clock, FileSystem, FileSystemError, HttpTransport, NavigationSink, NotificationSink,
    SessionRepository, StorageError, TransportError,
};
pub use use_cases::{Login, LoginInput, Logout};
