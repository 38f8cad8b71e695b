//! Roster Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, and the settings loader.

pub mod adapters;
pub mod persistence;
pub mod serialization;
pub mod settings;

pub use adapters::{ChannelSink, ReqwestTransport, SystemClock, TracingNotifier, UiEvent, ui_channel};
pub use persistence::{FileSessionRepository, SESSION_FILE, TokioFileSystem};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};
pub use settings::{ENV_PREFIX, SettingsError, load_settings, resolve_data_dir};
