//! Core error types for relaycast

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the relaycast ecosystem
#[derive(Error, Debug)]
pub enum RcError {
    /// Messaging collaborator error
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the external messaging collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Could not open a connection for the session
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Pairing code request was rejected or failed
    #[error("Pairing failed: {0}")]
    PairingFailed(String),

    /// A single message could not be delivered
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Transport-level failure talking to the collaborator
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection is already closed
    #[error("Connection closed")]
    Closed,
}

/// Session-related errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Session exists but has no usable connection
    #[error("Session not active: {0}")]
    NotActive(String),

    /// Credentials have not been written for this session yet
    #[error("Credentials not found for session: {0}")]
    CredentialsMissing(String),

    /// Session storage could not be provisioned or read
    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
