//! Pairing state machine

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use rc_core::traits::{Connection, ConnectionEvent, Connector, MessagingClient};
use rc_core::Severity;

use super::qr::{render_data_url, CODE_SENTINEL, QR_SENTINEL};
use crate::logs::LogRegistry;
use crate::session::{Session, SessionState};

const STREAM_ENDED: &str = "event stream ended";

/// What the event loop does after an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep consuming events
    Continue,
    /// Wait the settle delay, then request the pairing code
    RequestCode,
    /// The session is closed; stop consuming events
    Stop,
}

/// Drives one connection through its one-shot pairing flow
pub struct PairingOrchestrator {
    session: Arc<Session>,
    client: Arc<dyn MessagingClient>,
    logs: Arc<LogRegistry>,
    settle_delay: Duration,
}

impl PairingOrchestrator {
    pub fn new(
        session: Arc<Session>,
        client: Arc<dyn MessagingClient>,
        logs: Arc<LogRegistry>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            session,
            client,
            logs,
            settle_delay,
        }
    }

    /// Consume events until the connection closes.
    ///
    /// An event stream that ends without a close event is treated as one.
    pub async fn run(self, mut events: mpsc::Receiver<ConnectionEvent>) {
        tracing::debug!("[{}] Pairing flow started", self.session.key);

        while let Some(event) = events.recv().await {
            match self.handle(event) {
                Step::Continue => {}
                Step::Stop => return,
                Step::RequestCode => {
                    if !self.settle(&mut events).await {
                        return;
                    }
                    self.request_code().await;
                }
            }
        }

        self.handle(ConnectionEvent::Close {
            reason: Some(STREAM_ENDED.to_string()),
        });
    }

    /// Apply one event to the session
    pub fn handle(&self, event: ConnectionEvent) -> Step {
        let key = &self.session.key;

        if self.session.is_closed() {
            tracing::debug!("[{}] Ignoring {:?} on closed session", key, event);
            return Step::Stop;
        }

        match event {
            ConnectionEvent::Qr(data) => {
                if self.client.is_registered() {
                    tracing::debug!("[{}] Ignoring QR, already registered", key);
                    return Step::Continue;
                }

                self.session.set_state(SessionState::AwaitingQr);
                match render_data_url(&data) {
                    Ok(url) => {
                        self.log(Severity::Info, format!("{}{}", QR_SENTINEL, url));
                    }
                    Err(e) => {
                        self.log(Severity::Error, format!("QR render error: {}", e));
                    }
                }
                Step::Continue
            }
            ConnectionEvent::Open => {
                self.session.set_state(SessionState::Connected);
                self.session.touch();
                self.log(Severity::Info, "Connected to WhatsApp.");

                if self.client.is_registered() {
                    return Step::Continue;
                }
                if self.session.try_mark_pairing_requested() {
                    Step::RequestCode
                } else {
                    Step::Continue
                }
            }
            ConnectionEvent::Close { reason } => {
                self.session.set_state(SessionState::Closed);
                let text = match reason {
                    Some(reason) => format!(
                        "Connection closed ({}), not restarting to avoid code rotation",
                        reason
                    ),
                    None => "Connection closed, not restarting to avoid code rotation".to_string(),
                };
                self.log(Severity::Info, text);
                tracing::info!("[{}] Session closed", key);
                Step::Stop
            }
            ConnectionEvent::CredentialsUpdated => {
                tracing::debug!("[{}] Credentials updated", key);
                self.session.touch();
                Step::Continue
            }
        }
    }

    /// Wait out the settle delay while still handling events.
    ///
    /// Returns false if the session closed in the meantime.
    async fn settle(&self, events: &mut mpsc::Receiver<ConnectionEvent>) -> bool {
        let sleep = tokio::time::sleep(self.settle_delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return !self.session.is_closed(),
                event = events.recv() => match event {
                    Some(event) => {
                        if self.handle(event) == Step::Stop {
                            return false;
                        }
                    }
                    None => {
                        self.handle(ConnectionEvent::Close {
                            reason: Some(STREAM_ENDED.to_string()),
                        });
                        return false;
                    }
                },
            }
        }
    }

    fn log(&self, severity: Severity, text: impl AsRef<str>) {
        self.logs.append_for(&self.session, text, severity);
    }

    async fn request_code(&self) {
        let key = &self.session.key;
        tracing::info!("[{}] Requesting pairing code", key);

        match self
            .client
            .request_pairing_code(&self.session.phone_number)
            .await
        {
            Ok(code) => {
                self.log(Severity::Success, format!("{}{}", CODE_SENTINEL, code));
            }
            Err(e) => {
                tracing::warn!("[{}] Pairing code request failed: {}", key, e);
                self.log(Severity::Error, format!("pairing error: {}", e));
            }
        }
    }
}

/// Open the collaborator connection for `session` and run its pairing flow
/// on a background task.
pub fn spawn_pairing(
    connector: Arc<dyn Connector>,
    logs: Arc<LogRegistry>,
    session: Arc<Session>,
    settle_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Connection { client, events } =
            match connector.connect(&session.key, &session.auth_dir).await {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::error!("[{}] Failed to connect: {}", session.key, e);
                    logs.append_for(&session, format!("pairing error: {}", e), Severity::Error);
                    session.set_state(SessionState::Closed);
                    return;
                }
            };

        session.attach_client(Arc::clone(&client));

        // Torn down while connecting
        if session.is_retired() {
            if let Some(client) = session.take_client() {
                if let Err(e) = client.close().await {
                    tracing::warn!(
                        "Failed to close connection for session {}: {}",
                        session.key,
                        e
                    );
                }
            }
            return;
        }

        PairingOrchestrator::new(session, client, logs, settle_delay)
            .run(events)
            .await;
    })
}
