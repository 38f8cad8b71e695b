//! Application use cases (business logic orchestration).

mod login;
mod logout;

pub use login::*;
pub use logout::*;
