//! Session registry implementation

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use rc_core::error::SessionError;
use rc_core::time::{current_time_millis, elapsed_duration};
use rc_core::traits::MessagingClient;
use rc_core::SessionKey;

/// Name of the credentials file the collaborator writes into the auth directory
pub const CREDENTIALS_FILE: &str = "creds.json";

/// Pairing lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Connection is being opened
    Initializing,
    /// Unregistered and a QR challenge has been shown
    AwaitingQr,
    /// Connection is open
    Connected,
    /// Connection closed; the session is inert
    Closed,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            SessionState::Initializing => 0,
            SessionState::AwaitingQr => 1,
            SessionState::Connected => 2,
            SessionState::Closed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Initializing,
            1 => SessionState::AwaitingQr,
            2 => SessionState::Connected,
            _ => SessionState::Closed,
        }
    }
}

/// One pairing session
pub struct Session {
    /// Session key
    pub key: SessionKey,
    /// Phone number the pairing code is requested for
    pub phone_number: String,
    /// Directory the collaborator keeps its credential files in
    pub auth_dir: PathBuf,
    /// Creation time (ms since epoch)
    pub created_at: u64,
    /// Collaborator handle, set once the connection is opened
    client: RwLock<Option<Arc<dyn MessagingClient>>>,
    /// Current [`SessionState`]
    state: AtomicU8,
    /// Whether a pairing code has been requested
    pairing_requested: AtomicBool,
    /// Last time the session was used (ms since epoch)
    last_activity: AtomicU64,
    /// Set once the session is torn down
    retired: AtomicBool,
}

impl Session {
    fn new(key: SessionKey, phone_number: String, auth_dir: PathBuf) -> Self {
        let now = current_time_millis();
        Self {
            key,
            phone_number,
            auth_dir,
            created_at: now,
            client: RwLock::new(None),
            state: AtomicU8::new(SessionState::Initializing.as_u8()),
            pairing_requested: AtomicBool::new(false),
            last_activity: AtomicU64::new(now),
            retired: AtomicBool::new(false),
        }
    }

    /// Current pairing state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move to `next`. A closed session stays closed; returns false if the
    /// transition was refused.
    pub fn set_state(&self, next: SessionState) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if current == SessionState::Closed.as_u8() {
                    None
                } else {
                    Some(next.as_u8())
                }
            })
            .is_ok()
    }

    /// Whether the session reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Mark the session as torn down. Background work for it stops logging.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
        self.set_state(SessionState::Closed);
    }

    /// Whether the session was torn down
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Claim the one pairing-code request this session is allowed.
    ///
    /// Returns true only for the first caller.
    pub fn try_mark_pairing_requested(&self) -> bool {
        self.pairing_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether a pairing code has been requested
    pub fn pairing_requested(&self) -> bool {
        self.pairing_requested.load(Ordering::SeqCst)
    }

    /// Bind the collaborator handle
    pub fn attach_client(&self, client: Arc<dyn MessagingClient>) {
        if let Ok(mut slot) = self.client.write() {
            *slot = Some(client);
        }
        self.touch();
    }

    /// The collaborator handle, if one was attached
    pub fn client(&self) -> Option<Arc<dyn MessagingClient>> {
        self.client.read().ok().and_then(|slot| slot.clone())
    }

    /// Detach and return the collaborator handle
    pub fn take_client(&self) -> Option<Arc<dyn MessagingClient>> {
        self.client.write().ok().and_then(|mut slot| slot.take())
    }

    /// The handle of a connected session, or `NotActive`
    pub fn active_client(&self) -> Result<Arc<dyn MessagingClient>, SessionError> {
        if self.state() != SessionState::Connected {
            return Err(SessionError::NotActive(self.key.to_string()));
        }
        self.client()
            .ok_or_else(|| SessionError::NotActive(self.key.to_string()))
    }

    /// Record activity now
    pub fn touch(&self) {
        self.last_activity
            .store(current_time_millis(), Ordering::SeqCst);
    }

    /// Last activity (ms since epoch)
    pub fn last_activity(&self) -> u64 {
        self.last_activity.load(Ordering::SeqCst)
    }

    /// Time since the last activity
    pub fn idle_for(&self) -> Duration {
        elapsed_duration(self.last_activity())
    }

    /// Path of the credentials file inside the auth directory
    pub fn credentials_path(&self) -> PathBuf {
        self.auth_dir.join(CREDENTIALS_FILE)
    }
}

/// Maps session keys to sessions and owns the on-disk session layout
pub struct SessionRegistry {
    /// Root directory, one `<key>/auth` subdirectory per session
    sessions_dir: PathBuf,
    /// Sessions indexed by key
    sessions: DashMap<SessionKey, Arc<Session>>,
}

impl SessionRegistry {
    /// Create a registry rooted at `sessions_dir`
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            sessions: DashMap::new(),
        }
    }

    /// Root directory of all sessions
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Auth directory for a key
    pub fn auth_dir(&self, key: &SessionKey) -> PathBuf {
        self.sessions_dir.join(key.as_str()).join("auth")
    }

    /// Allocate a new session and provision its auth directory
    pub async fn create(&self, phone_number: &str) -> Result<Arc<Session>, SessionError> {
        let session = loop {
            let key = SessionKey::generate();
            match self.sessions.entry(key.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!("Session key collision on {}, regenerating", key);
                    continue;
                }
                Entry::Vacant(slot) => {
                    let auth_dir = self.auth_dir(&key);
                    let session = Arc::new(Session::new(key, phone_number.to_string(), auth_dir));
                    slot.insert(Arc::clone(&session));
                    break session;
                }
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&session.auth_dir).await {
            self.sessions.remove(&session.key);
            return Err(SessionError::Storage(e));
        }

        tracing::info!("Created session {} ({:?})", session.key, session.auth_dir);
        Ok(session)
    }

    /// Bind a collaborator handle to a session
    pub fn attach_handle(
        &self,
        key: &SessionKey,
        client: Arc<dyn MessagingClient>,
    ) -> Result<(), SessionError> {
        let session = self.get(key)?;
        session.attach_client(client);
        Ok(())
    }

    /// Get a session by key
    pub fn get(&self, key: &SessionKey) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .get(key)
            .map(|r| Arc::clone(&r))
            .ok_or_else(|| SessionError::NotFound(key.to_string()))
    }

    /// Remove a session from the registry
    pub fn remove(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.remove(key).map(|(_, session)| session)
    }

    /// List all sessions
    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|r| Arc::clone(&r)).collect()
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
