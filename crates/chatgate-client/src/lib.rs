//! Session-side client for a chatgate server.
//!
//! Owns the ordered transcript, sends one request per user turn and decodes
//! the streamed answer incrementally, rewriting the trailing placeholder
//! turn as bytes arrive.

pub mod decode;
pub mod session;
pub mod transcript;

pub use decode::StreamDecoder;
pub use session::{ChatSession, SessionError, Submission};
pub use transcript::Transcript;
