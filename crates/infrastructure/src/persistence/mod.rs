//! File-backed persistence of the session.

mod file_system;
mod session_repository;

pub use file_system::TokioFileSystem;
pub use session_repository::{FileSessionRepository, SESSION_FILE};
