//! JSON encoding of files written by the client.
//!
//! Output is pretty-printed with 2-space indentation and a trailing newline
//! so a session file can be inspected by hand.

mod json;

pub use json::*;
