//! Session repository port
//!
//! Durable storage for the session so a restart does not force a new
//! login. Only the session is stored; transient UI state never is.

use async_trait::async_trait;
use roster_domain::Session;

/// Errors that can occur while reading or writing the session.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The file was written by an incompatible version.
    #[error("unsupported session schema version {0}")]
    UnsupportedSchema(u32),
}

/// Repository trait for session persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loads the stored session.
    ///
    /// # Returns
    /// `None` if nothing has been stored.
    async fn load(&self) -> Result<Option<Session>, StorageError>;

    /// Replaces the stored session.
    ///
    /// # Errors
    /// Returns an error if the session cannot be written.
    async fn save(&self, session: &Session) -> Result<(), StorageError>;

    /// Removes the stored session. Removing nothing is not an error.
    ///
    /// # Errors
    /// Returns an error if the stored session exists but cannot be removed.
    async fn clear(&self) -> Result<(), StorageError>;
}
