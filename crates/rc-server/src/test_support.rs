//! In-memory collaborator used by the unit tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use rc_core::error::ClientError;
use rc_core::traits::{Connection, ConnectionEvent, Connector, MessagingClient, OutgoingMessage};
use rc_core::SessionKey;

pub(crate) const FAKE_PAIRING_CODE: &str = "ABCD-1234";

/// Records everything it is asked to do
pub(crate) struct FakeClient {
    registered: AtomicBool,
    closed: AtomicBool,
    failing: Mutex<Vec<String>>,
    pairing_error: Mutex<Option<ClientError>>,
    send_delay: Mutex<Duration>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    attempts: Mutex<Vec<String>>,
    pairing_calls: Mutex<Vec<String>>,
}

impl FakeClient {
    fn build(registered: bool) -> Arc<Self> {
        Arc::new(Self {
            registered: AtomicBool::new(registered),
            closed: AtomicBool::new(false),
            failing: Mutex::new(Vec::new()),
            pairing_error: Mutex::new(None),
            send_delay: Mutex::new(Duration::ZERO),
            sent: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            pairing_calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn registered() -> Arc<Self> {
        Self::build(true)
    }

    pub(crate) fn unregistered() -> Arc<Self> {
        Self::build(false)
    }

    /// Sends to `target` fail
    pub(crate) fn failing_for(self: Arc<Self>, target: &str) -> Arc<Self> {
        self.failing.lock().unwrap().push(target.to_string());
        self
    }

    /// Pairing-code requests fail with `error`
    pub(crate) fn with_pairing_error(self: Arc<Self>, error: ClientError) -> Arc<Self> {
        *self.pairing_error.lock().unwrap() = Some(error);
        self
    }

    /// Every send takes `delay` before it completes
    pub(crate) fn with_send_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.send_delay.lock().unwrap() = delay;
        self
    }

    /// Successful sends, in order
    pub(crate) fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    /// Every send attempt's target, in order
    pub(crate) fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Phone numbers a pairing code was requested for
    pub(crate) fn pairing_calls(&self) -> Vec<String> {
        self.pairing_calls.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingClient for FakeClient {
    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    async fn request_pairing_code(&self, phone_number: &str) -> Result<String, ClientError> {
        self.pairing_calls
            .lock()
            .unwrap()
            .push(phone_number.to_string());
        match self.pairing_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(FAKE_PAIRING_CODE.to_string()),
        }
    }

    async fn send_message(&self, to: &str, message: OutgoingMessage) -> Result<(), ClientError> {
        self.attempts.lock().unwrap().push(to.to_string());
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().iter().any(|t| t == to) {
            return Err(ClientError::SendFailed("recipient unreachable".into()));
        }
        self.sent.lock().unwrap().push((to.to_string(), message));
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one [`FakeClient`] per session and keeps the event senders so
/// tests can drive the connection
pub(crate) struct FakeConnector {
    registered: bool,
    fail: bool,
    connections: Mutex<HashMap<SessionKey, (Arc<FakeClient>, mpsc::Sender<ConnectionEvent>)>>,
}

impl FakeConnector {
    pub(crate) fn new(registered: bool) -> Arc<Self> {
        Arc::new(Self {
            registered,
            fail: false,
            connections: Mutex::new(HashMap::new()),
        })
    }

    /// Every connect attempt fails
    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            registered: false,
            fail: true,
            connections: Mutex::new(HashMap::new()),
        })
    }

    fn lookup(&self, key: &SessionKey) -> Option<(Arc<FakeClient>, mpsc::Sender<ConnectionEvent>)> {
        self.connections.lock().unwrap().get(key).cloned()
    }

    /// Wait until `key` has connected
    pub(crate) async fn connection(
        &self,
        key: &SessionKey,
    ) -> (Arc<FakeClient>, mpsc::Sender<ConnectionEvent>) {
        for _ in 0..500 {
            if let Some(found) = self.lookup(key) {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("session {} never connected", key);
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        session_key: &SessionKey,
        _auth_dir: &Path,
    ) -> Result<Connection, ClientError> {
        if self.fail {
            return Err(ClientError::ConnectFailed("bridge unreachable".into()));
        }

        let client = FakeClient::build(self.registered);
        let (tx, rx) = mpsc::channel(32);
        self.connections
            .lock()
            .unwrap()
            .insert(session_key.clone(), (Arc::clone(&client), tx));

        Ok(Connection {
            client,
            events: rx,
        })
    }
}
