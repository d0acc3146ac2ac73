//! Shared server state

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use rc_core::config::ServerConfig;
use rc_core::error::SessionError;
use rc_core::traits::Connector;
use rc_core::SessionKey;

use crate::broadcast::{BroadcastJob, JobHandle, JobRegistry};
use crate::logs::LogRegistry;
use crate::pairing::spawn_pairing;
use crate::session::{Session, SessionRegistry};

/// Registries and configuration shared by every request handler and
/// background task
pub struct AppState {
    /// Configuration
    pub config: ServerConfig,
    /// Session registry
    pub sessions: Arc<SessionRegistry>,
    /// Session logs and their live subscribers
    pub logs: Arc<LogRegistry>,
    /// Broadcast jobs
    pub jobs: Arc<JobRegistry>,
    /// Opens collaborator connections
    pub connector: Arc<dyn Connector>,
    /// Cancelled when the server shuts down; long-lived responses end on it
    pub shutdown: CancellationToken,
    started_at: Instant,
}

impl AppState {
    /// Create state for `config`, connecting sessions through `connector`
    pub fn new(config: ServerConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(config.sessions_dir.clone())),
            logs: Arc::new(LogRegistry::new(config.retention.max_log_entries)),
            jobs: Arc::new(JobRegistry::new()),
            connector,
            config,
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// Time since the state was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Allocate a session and start pairing it in the background.
    ///
    /// Returns as soon as the session exists; pairing progress shows up in
    /// the session log.
    pub async fn start_session(&self, phone_number: &str) -> Result<Arc<Session>, SessionError> {
        let session = self.sessions.create(phone_number).await?;
        self.logs.info(
            &session.key,
            format!("Starting pairing session for: {}", phone_number),
        );

        spawn_pairing(
            Arc::clone(&self.connector),
            Arc::clone(&self.logs),
            Arc::clone(&session),
            self.config.pairing.settle_delay,
        );

        Ok(session)
    }

    /// Start a broadcast on a connected session
    pub fn start_broadcast(
        &self,
        key: &SessionKey,
        job: BroadcastJob,
    ) -> Result<Arc<JobHandle>, SessionError> {
        let session = self.sessions.get(key)?;
        let client = session.active_client()?;
        Ok(self.jobs.spawn(session, client, Arc::clone(&self.logs), job))
    }

    /// Close a session's connection and drop everything kept for it in
    /// memory. Returns false if the session was unknown.
    pub async fn teardown_session(&self, key: &SessionKey) -> bool {
        let Some(session) = self.sessions.remove(key) else {
            return false;
        };

        session.retire();
        if let Some(client) = session.take_client() {
            if let Err(e) = client.close().await {
                tracing::warn!("Failed to close connection for session {}: {}", key, e);
            }
        }

        self.logs.remove(key);
        let jobs = self.jobs.forget_session(key);

        tracing::info!("Session {} torn down ({} job records dropped)", key, jobs);
        true
    }
}
