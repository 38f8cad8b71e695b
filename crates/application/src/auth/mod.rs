//! Authenticated request pipeline.
//!
//! This module provides:
//! - [`TokenStore`]: the single live session, persisted and observable
//! - [`sign`]: attaches the bearer token to a request
//! - [`RefreshCoordinator`]: collapses concurrent refresh demands into one call
//! - [`SessionTeardown`]: ends the session after an unrecoverable refresh failure
//! - [`AuthenticatedClient`]: sign, send, refresh once, retry once

mod client;
mod refresh;
mod signer;
mod teardown;
mod token_store;

pub use client::{AuthenticatedClient, PipelineConfig};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use signer::{bearer, sign};
pub use teardown::{SessionSinks, SessionTeardown};
pub use token_store::TokenStore;
