//! UI sink adapters.
//!
//! The pipeline pushes notices and route changes into an unbounded channel;
//! whatever drives the UI drains it on its own schedule.

use std::sync::Arc;

use roster_application::SessionSinks;
use roster_application::ports::{NavigationSink, NotificationSink};
use roster_domain::{Notice, NoticeLevel};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Event delivered to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Show a notice to the user.
    Notice(Notice),
    /// Move to a route, e.g. `/login`.
    Navigate(String),
}

/// Sink that forwards into a [`UiEvent`] channel.
///
/// A closed receiver drops events silently; the UI is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    /// Wraps a sender.
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            debug!("ui channel closed; event dropped");
        }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notice: Notice) {
        self.forward(UiEvent::Notice(notice));
    }
}

impl NavigationSink for ChannelSink {
    fn navigate(&self, route: &str) {
        self.forward(UiEvent::Navigate(route.to_string()));
    }
}

/// Creates session sinks backed by one channel, and its receiving end.
#[must_use]
pub fn ui_channel() -> (SessionSinks, mpsc::UnboundedReceiver<UiEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = Arc::new(ChannelSink::new(tx));
    (SessionSinks::new(sink.clone(), sink), rx)
}

/// Notification sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(kind = ?notice.kind, "{}", notice.message),
            NoticeLevel::Error => error!(kind = ?notice.kind, "{}", notice.message),
        }
    }
}
