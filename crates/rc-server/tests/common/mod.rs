//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use rc_core::config::ServerConfig;
use rc_core::error::ClientError;
use rc_core::traits::{Connection, ConnectionEvent, Connector, MessagingClient, OutgoingMessage};
use rc_core::SessionKey;
use rc_server::AppState;

/// Registered client that records every message
#[derive(Default)]
pub struct RecordingClient {
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
}

impl RecordingClient {
    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for RecordingClient {
    fn is_registered(&self) -> bool {
        true
    }

    async fn request_pairing_code(&self, _phone_number: &str) -> Result<String, ClientError> {
        Ok("ABCD-1234".into())
    }

    async fn send_message(&self, to: &str, message: OutgoingMessage) -> Result<(), ClientError> {
        self.sent.lock().unwrap().push((to.to_string(), message));
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Connector that keeps each session's event sender for the test to drive
#[derive(Default)]
pub struct TestConnector {
    connections: Mutex<HashMap<SessionKey, (Arc<RecordingClient>, mpsc::Sender<ConnectionEvent>)>>,
}

impl TestConnector {
    pub async fn connection(
        &self,
        key: &SessionKey,
    ) -> (Arc<RecordingClient>, mpsc::Sender<ConnectionEvent>) {
        for _ in 0..500 {
            if let Some(found) = self.connections.lock().unwrap().get(key).cloned() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("session {} never connected", key);
    }
}

#[async_trait]
impl Connector for TestConnector {
    async fn connect(
        &self,
        session_key: &SessionKey,
        _auth_dir: &Path,
    ) -> Result<Connection, ClientError> {
        let client = Arc::new(RecordingClient::default());
        let (tx, rx) = mpsc::channel(16);
        self.connections
            .lock()
            .unwrap()
            .insert(session_key.clone(), (Arc::clone(&client), tx));
        Ok(Connection { client, events: rx })
    }
}

pub struct TestApp {
    pub dir: tempfile::TempDir,
    pub state: Arc<AppState>,
    pub connector: Arc<TestConnector>,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            sessions_dir: dir.path().to_path_buf(),
            default_delay: Duration::from_millis(1),
            ..ServerConfig::default()
        };
        let connector = Arc::new(TestConnector::default());
        let state = Arc::new(AppState::new(config, connector.clone()));
        Self {
            dir,
            state,
            connector,
        }
    }

    pub fn router(&self) -> axum::Router {
        rc_server::http::build_router(Arc::clone(&self.state))
    }
}
