//! Messaging collaborator traits
//!
//! The wire protocol (handshake, encryption, multi-device sync) lives outside
//! this repository. These traits are the whole surface relaycast relies on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::types::SessionKey;

/// Connection-state transitions emitted by the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A QR challenge the user can scan instead of entering a pairing code
    Qr(String),
    /// The connection is open
    Open,
    /// The connection closed; it will not be reopened
    Close { reason: Option<String> },
    /// The collaborator persisted updated credentials
    CredentialsUpdated,
}

/// Payload of an outgoing text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Message body
    pub text: String,
    /// Canonical addresses of mentioned users
    pub mentions: Vec<String>,
}

impl OutgoingMessage {
    /// Plain text without mentions
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mentions: Vec::new(),
        }
    }
}

/// Live connection handle for one session
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Whether the stored credentials already belong to a linked device
    fn is_registered(&self) -> bool;

    /// Ask the collaborator for a one-time pairing code for `phone_number`
    async fn request_pairing_code(&self, phone_number: &str) -> Result<String, ClientError>;

    /// Deliver a message to a canonical address
    async fn send_message(&self, to: &str, message: OutgoingMessage) -> Result<(), ClientError>;

    /// Close the connection
    async fn close(&self) -> Result<(), ClientError>;
}

/// An opened connection: the handle plus its event stream
pub struct Connection {
    /// Handle used for pairing and sending
    pub client: Arc<dyn MessagingClient>,
    /// Connection-state events, in the order the collaborator emitted them
    pub events: mpsc::Receiver<ConnectionEvent>,
}

/// Opens collaborator connections backed by a per-session auth directory
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection whose credentials live in `auth_dir`
    async fn connect(
        &self,
        session_key: &SessionKey,
        auth_dir: &Path,
    ) -> Result<Connection, ClientError>;
}
