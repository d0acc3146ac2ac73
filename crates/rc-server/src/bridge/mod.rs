//! HTTP bridge to the protocol sidecar
//!
//! The sidecar speaks the messaging protocol and owns the credential files
//! in each session's auth directory. relaycast drives it over a small JSON
//! API and reads connection events from a newline-delimited JSON stream.

mod connector;
mod events;

pub use connector::{BridgeClient, BridgeConnector};
pub use events::{LineBuffer, WireEvent};
