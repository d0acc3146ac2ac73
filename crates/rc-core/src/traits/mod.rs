//! Core trait definitions

mod client;

pub use client::{Connection, ConnectionEvent, Connector, MessagingClient, OutgoingMessage};
