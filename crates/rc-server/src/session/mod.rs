//! Session management

mod cleanup;
mod credentials;
mod manager;

pub use cleanup::{run_retention, sweep_idle_sessions};
pub use manager::{Session, SessionRegistry, SessionState, CREDENTIALS_FILE};
