//! rc-server: WhatsApp session pairing and paced broadcasts over HTTP
//!
//! Sessions are paired through an external messaging bridge. Their progress
//! is recorded in a per-session log that browsers follow over SSE, and once
//! paired a session can run sequential broadcast jobs.

pub mod bridge;
pub mod broadcast;
pub mod http;
pub mod logs;
pub mod pairing;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use state::AppState;
