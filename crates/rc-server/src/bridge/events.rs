//! Bridge event stream decoding

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

use rc_core::traits::ConnectionEvent;

/// One event as the bridge sends it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireEvent {
    Qr {
        data: String,
    },
    Open {
        #[serde(default)]
        registered: bool,
    },
    Close {
        #[serde(default)]
        reason: Option<String>,
    },
    Creds {
        #[serde(default)]
        registered: bool,
    },
}

impl WireEvent {
    /// Parse one line of the stream. Blank and malformed lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Ignoring malformed bridge event {:?}: {}", line, e);
                None
            }
        }
    }

    /// Convert to a [`ConnectionEvent`], recording the registration flag
    /// carried by `open` and `creds` events.
    pub fn into_connection_event(self, registered: &AtomicBool) -> ConnectionEvent {
        match self {
            WireEvent::Qr { data } => ConnectionEvent::Qr(data),
            WireEvent::Open { registered: flag } => {
                registered.store(flag, Ordering::SeqCst);
                ConnectionEvent::Open
            }
            WireEvent::Close { reason } => ConnectionEvent::Close { reason },
            WireEvent::Creds { registered: flag } => {
                registered.store(flag, Ordering::SeqCst);
                ConnectionEvent::CredentialsUpdated
            }
        }
    }
}

/// Splits a chunked byte stream into lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Whatever is left once the stream ends
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}
