//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the request pipeline and the outside
//! world. Each port is a trait implemented by adapters in the infrastructure
//! layer, or by in-memory fakes in tests.

mod clock;
mod file_system;
mod http_transport;
mod session_repository;
mod sinks;

pub use clock::Clock;
pub use file_system::{FileSystem, FileSystemError};
pub use http_transport::{HttpTransport, TransportError};
pub use session_repository::{SessionRepository, StorageError};
pub use sinks::{NavigationSink, NotificationSink};
