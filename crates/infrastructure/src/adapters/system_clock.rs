//! Wall-clock source for session timestamps

use chrono::{DateTime, SubsecRound, Utc};
use roster_application::ports::Clock;

/// Stamps `saved_at` on every persisted session.
///
/// Timestamps are truncated to whole seconds so the session file stays
/// stable across rewrites within the same second.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates the clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}
