//! Adapters for the transport, clock and UI ports.

mod reqwest_transport;
mod system_clock;
mod ui_sinks;

pub use reqwest_transport::ReqwestTransport;
pub use system_clock::SystemClock;
pub use ui_sinks::{ChannelSink, TracingNotifier, UiEvent, ui_channel};
