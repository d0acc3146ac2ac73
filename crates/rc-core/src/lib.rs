//! rc-core: Core abstractions and configuration for relaycast
//!
//! This crate provides the shared types, the messaging collaborator traits,
//! and the configuration structures used by the relaycast server.

pub mod address;
pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::RcError;
pub use types::{LogEntry, SessionKey, Severity, TargetType};
