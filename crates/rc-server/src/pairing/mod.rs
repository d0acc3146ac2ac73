//! Pairing flow
//!
//! One [`PairingOrchestrator`] per session consumes the collaborator's
//! connection events and writes the outcome into the session log.

mod orchestrator;
pub mod qr;

pub use orchestrator::{spawn_pairing, PairingOrchestrator, Step};
pub use qr::{CODE_SENTINEL, QR_SENTINEL};
