//! Clock port

use chrono::{DateTime, Utc};

/// Port for reading the current time.
///
/// Persisted sessions are stamped through this port so tests can pin the
/// timestamp.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
