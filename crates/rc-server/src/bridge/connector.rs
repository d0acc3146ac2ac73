//! Bridge connector and client

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use rc_core::config::BridgeConfig;
use rc_core::error::ClientError;
use rc_core::traits::{Connection, ConnectionEvent, Connector, MessagingClient, OutgoingMessage};
use rc_core::SessionKey;

use super::events::{LineBuffer, WireEvent};

/// Events buffered between the stream reader and the pairing flow
const EVENT_BUFFER: usize = 64;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenSessionRequest<'a> {
    session_key: &'a str,
    auth_dir: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PairingCodeRequest<'a> {
    phone_number: &'a str,
}

#[derive(Deserialize)]
struct PairingCodeResponse {
    code: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    to: &'a str,
    text: &'a str,
    mentions: &'a [String],
}

/// Opens sessions on the bridge
pub struct BridgeConnector {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl BridgeConnector {
    pub fn new(config: &BridgeConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        })
    }
}

#[async_trait]
impl Connector for BridgeConnector {
    async fn connect(
        &self,
        session_key: &SessionKey,
        auth_dir: &Path,
    ) -> Result<Connection, ClientError> {
        let open = OpenSessionRequest {
            session_key: session_key.as_str(),
            auth_dir: auth_dir.to_string_lossy().into_owned(),
        };
        let response = self
            .http
            .post(format!("{}/sessions", self.base_url))
            .timeout(self.request_timeout)
            .json(&open)
            .send()
            .await
            .map_err(|e| ClientError::ConnectFailed(e.to_string()))?;
        ensure_success(response)
            .await
            .map_err(ClientError::ConnectFailed)?;

        // No timeout: the stream lives as long as the connection
        let events = self
            .http
            .get(format!("{}/sessions/{}/events", self.base_url, session_key))
            .send()
            .await
            .map_err(|e| ClientError::ConnectFailed(e.to_string()))?;
        let events = ensure_success(events)
            .await
            .map_err(ClientError::ConnectFailed)?;

        tracing::info!("Opened bridge session {}", session_key);

        let registered = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(
            session_key.clone(),
            events,
            Arc::clone(&registered),
            tx,
        ));

        let client = BridgeClient {
            http: self.http.clone(),
            session_url: format!("{}/sessions/{}", self.base_url, session_key),
            request_timeout: self.request_timeout,
            registered,
        };

        Ok(Connection {
            client: Arc::new(client),
            events: rx,
        })
    }
}

/// Handle to one open bridge session
pub struct BridgeClient {
    http: reqwest::Client,
    session_url: String,
    request_timeout: Duration,
    registered: Arc<AtomicBool>,
}

impl BridgeClient {
    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response, String> {
        let response = self
            .http
            .post(format!("{}/{}", self.session_url, path))
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        ensure_success(response).await
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    async fn request_pairing_code(&self, phone_number: &str) -> Result<String, ClientError> {
        let response = self
            .post("pairing-code", &PairingCodeRequest { phone_number })
            .await
            .map_err(ClientError::PairingFailed)?;

        let body: PairingCodeResponse = response
            .json()
            .await
            .map_err(|e| ClientError::PairingFailed(e.to_string()))?;
        Ok(body.code)
    }

    async fn send_message(&self, to: &str, message: OutgoingMessage) -> Result<(), ClientError> {
        let body = SendMessageRequest {
            to,
            text: &message.text,
            mentions: &message.mentions,
        };
        self.post("messages", &body)
            .await
            .map_err(ClientError::SendFailed)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(&self.session_url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        ensure_success(response)
            .await
            .map_err(ClientError::Transport)?;
        Ok(())
    }
}

/// Turn a non-2xx response into `"<status>: <body>"`
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("{}: {}", status, body.trim()))
}

/// Forward decoded stream events until the stream or the receiver goes away
async fn pump_events(
    session_key: SessionKey,
    response: reqwest::Response,
    registered: Arc<AtomicBool>,
    tx: mpsc::Sender<ConnectionEvent>,
) {
    let mut stream = response.bytes_stream();
    let mut lines = LineBuffer::default();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("[{}] Bridge event stream failed: {}", session_key, e);
                return;
            }
        };

        for line in lines.push(&chunk) {
            if let Some(event) = WireEvent::parse(&line) {
                if tx.send(event.into_connection_event(&registered)).await.is_err() {
                    return;
                }
            }
        }
    }

    if let Some(event) = lines.finish().as_deref().and_then(WireEvent::parse) {
        let _ = tx.send(event.into_connection_event(&registered)).await;
    }
    tracing::debug!("[{}] Bridge event stream ended", session_key);
}
