//! File-based session repository implementation.
//!
//! The session is stored in `<data_dir>/session.json`:
//! ```json
//! {
//!   "schema_version": 1,
//!   "saved_at": "2026-03-02T09:15:00Z",
//!   "session": {
//!     "access_token": "eyJhbGciOi...",
//!     "identity": {
//!       "id": 7,
//!       "name": "Sam Member",
//!       "email": "member@example.com",
//!       "role": "member",
//!       "flags": { "active": true }
//!     }
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use roster_application::ports::{Clock, FileSystem, FileSystemError, SessionRepository, StorageError};
use roster_domain::{PersistedSession, Session};
use tracing::debug;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// File name of the stored session.
pub const SESSION_FILE: &str = "session.json";

/// File-based session repository.
#[derive(Debug, Clone)]
pub struct FileSessionRepository<F, C> {
    fs: F,
    clock: C,
    path: PathBuf,
}

impl<F: FileSystem, C: Clock> FileSessionRepository<F, C> {
    /// Creates a repository storing `session.json` in `data_dir`.
    pub fn new(fs: F, clock: C, data_dir: &Path) -> Self {
        Self {
            fs,
            clock,
            path: data_dir.join(SESSION_FILE),
        }
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<F: FileSystem, C: Clock> SessionRepository for FileSessionRepository<F, C> {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        if !self.fs.exists(&self.path).await {
            return Ok(None);
        }

        let content = self
            .fs
            .read_file(&self.path)
            .await
            .map_err(|e| StorageError::Io(e.into()))?;

        let persisted: PersistedSession =
            from_json_bytes(&content).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if !persisted.is_supported() {
            return Err(StorageError::UnsupportedSchema(persisted.schema_version));
        }

        debug!(path = %self.path.display(), saved_at = %persisted.saved_at, "loaded session file");
        Ok(Some(persisted.session))
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let persisted = PersistedSession::new(session.clone(), self.clock.now());
        let content = to_json_stable_bytes(&persisted)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.fs
            .write_file(&self.path, &content)
            .await
            .map_err(|e| StorageError::Io(e.into()))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match self.fs.remove_file(&self.path).await {
            Ok(()) | Err(FileSystemError::NotFound(_)) => Ok(()),
            Err(e) => Err(StorageError::Io(e.into())),
        }
    }
}
