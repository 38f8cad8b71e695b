//! Roster Domain - Core client types
//!
//! This crate defines the domain model for the Roster API client:
//! requests and responses, the authenticated session, endpoint identity,
//! user-facing notices, and client settings.
//! All types here are pure Rust with no I/O dependencies.

pub mod endpoint;
pub mod error;
pub mod notice;
pub mod request;
pub mod response;
pub mod session;
pub mod settings;

pub use endpoint::AuthEndpoints;
pub use error::{DomainError, DomainResult};
pub use notice::{Notice, NoticeKind, NoticeLevel};
pub use request::{ApiRequest, Attempt, Header, Headers, HttpMethod, RequestBody};
pub use response::{ApiResponse, StatusCode};
pub use session::{Identity, IdentityFlags, PersistedSession, Role, Session, token_preview};
pub use settings::ClientSettings;
