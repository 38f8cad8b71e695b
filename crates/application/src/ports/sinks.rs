//! One-way UI sinks.
//!
//! The pipeline only ever writes into these; it never reads back.

use roster_domain::Notice;

/// Receives user-facing notices ("session expired", "permission denied").
pub trait NotificationSink: Send + Sync {
    /// Delivers a notice. Must not block.
    fn notify(&self, notice: Notice);
}

/// Receives navigation requests, e.g. a move to `/login`.
pub trait NavigationSink: Send + Sync {
    /// Requests navigation to `route`. Must not block.
    fn navigate(&self, route: &str);
}
