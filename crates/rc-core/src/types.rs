//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionError;

/// Opaque identifier for a pairing session: 16 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Length of a session key in characters
    pub const LEN: usize = 16;

    /// Generate a fresh key from 64 bits of randomness
    pub fn generate() -> Self {
        let bytes: [u8; Self::LEN / 2] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Parse a key received from a client.
    ///
    /// Anything that is not exactly 16 lowercase hex characters is reported
    /// as not found, which also keeps keys safe to use as path components.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let valid = raw.len() == Self::LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(SessionError::NotFound(raw.to_string()))
        }
    }

    /// Get the raw key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity tag of a session log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One line of a session's user-visible log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamped message, `[YYYY-MM-DD HH:MM:SS] text`
    pub message: String,
    /// Severity, serialized as `type` for the UI
    #[serde(rename = "type")]
    pub severity: Severity,
}

impl LogEntry {
    /// Create an entry stamped with the current local time
    pub fn new(text: impl AsRef<str>, severity: Severity) -> Self {
        Self {
            message: format!("[{}] {}", crate::time::log_timestamp(), text.as_ref()),
            severity,
        }
    }

    /// The message without its timestamp prefix
    pub fn text(&self) -> &str {
        self.message
            .split_once("] ")
            .map(|(_, text)| text)
            .unwrap_or(&self.message)
    }
}

/// Kind of broadcast recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[default]
    User,
    Group,
}

impl From<&str> for TargetType {
    /// Anything other than `group` is treated as a user target
    fn from(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("group") {
            TargetType::Group
        } else {
            TargetType::User
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::User => write!(f, "user"),
            TargetType::Group => write!(f, "group"),
        }
    }
}
