//! Log registry implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use rc_core::{LogEntry, SessionKey, Severity};

use crate::session::Session;

/// Identifier of one live log subscriber
pub type SubscriberId = u64;

/// Per-session append-only logs with live fan-out to subscribers
///
/// Each session's buffer and subscriber list sit behind the same map entry,
/// so an append and a subscribe on one session never interleave: a new
/// subscriber sees every retained entry exactly once, backlog first.
pub struct LogRegistry {
    /// Buffers indexed by session key
    logs: DashMap<SessionKey, SessionLog>,
    /// Entries retained per session
    max_entries: usize,
    /// Next subscriber ID to allocate
    next_subscriber_id: AtomicU64,
}

#[derive(Default)]
struct SessionLog {
    entries: VecDeque<LogEntry>,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<LogEntry>,
}

/// Receiving end of a log subscription
pub struct LogSubscription {
    id: SubscriberId,
    key: SessionKey,
    rx: mpsc::UnboundedReceiver<LogEntry>,
}

impl LogRegistry {
    /// Create a registry keeping at most `max_entries` entries per session
    pub fn new(max_entries: usize) -> Self {
        Self {
            logs: DashMap::new(),
            max_entries: max_entries.max(1),
            next_subscriber_id: AtomicU64::new(1),
        }
    }

    /// Append an entry and push it to every live subscriber of the session
    ///
    /// The buffer is created on first use. Subscribers whose receiver is gone
    /// are dropped here.
    pub fn append(&self, key: &SessionKey, text: impl AsRef<str>, severity: Severity) -> LogEntry {
        let entry = LogEntry::new(text, severity);
        tracing::debug!("[{}] {} {}", key, severity, entry.text());

        let mut guard = self.logs.entry(key.clone()).or_default();
        self.push(&mut guard, &entry);
        entry
    }

    /// Append on behalf of `session`, unless it has been torn down.
    ///
    /// The retired flag is read while the session's map entry is held, and
    /// teardown retires before it removes the buffer, so a late entry never
    /// brings a removed buffer back.
    pub fn append_for(
        &self,
        session: &Session,
        text: impl AsRef<str>,
        severity: Severity,
    ) -> Option<LogEntry> {
        let key = &session.key;
        let entry = LogEntry::new(text, severity);

        match self.logs.entry(key.clone()) {
            _ if session.is_retired() => {
                tracing::debug!("[{}] Dropping log after teardown: {}", key, entry.text());
                None
            }
            Entry::Occupied(mut slot) => {
                tracing::debug!("[{}] {} {}", key, severity, entry.text());
                self.push(slot.get_mut(), &entry);
                Some(entry)
            }
            Entry::Vacant(slot) => {
                tracing::debug!("[{}] {} {}", key, severity, entry.text());
                let mut log = slot.insert(SessionLog::default());
                self.push(&mut log, &entry);
                Some(entry)
            }
        }
    }

    fn push(&self, log: &mut SessionLog, entry: &LogEntry) {
        log.entries.push_back(entry.clone());
        while log.entries.len() > self.max_entries {
            log.entries.pop_front();
        }

        log.subscribers
            .retain(|sub| sub.tx.send(entry.clone()).is_ok());
    }

    /// Shorthand for an info entry
    pub fn info(&self, key: &SessionKey, text: impl AsRef<str>) -> LogEntry {
        self.append(key, text, Severity::Info)
    }

    /// Shorthand for a success entry
    pub fn success(&self, key: &SessionKey, text: impl AsRef<str>) -> LogEntry {
        self.append(key, text, Severity::Success)
    }

    /// Shorthand for an error entry
    pub fn error(&self, key: &SessionKey, text: impl AsRef<str>) -> LogEntry {
        self.append(key, text, Severity::Error)
    }

    /// Attach a new subscriber, replaying the retained backlog first
    pub fn subscribe(&self, key: &SessionKey) -> LogSubscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut guard = self.logs.entry(key.clone()).or_default();
        for entry in &guard.entries {
            // Receiver is alive: we still own it
            let _ = tx.send(entry.clone());
        }
        guard.subscribers.push(Subscriber { id, tx });
        drop(guard);

        tracing::debug!("[{}] Log subscriber {} attached", key, id);

        LogSubscription {
            id,
            key: key.clone(),
            rx,
        }
    }

    /// Detach a subscriber. Unknown sessions or IDs are ignored.
    pub fn unsubscribe(&self, key: &SessionKey, id: SubscriberId) {
        if let Some(mut log) = self.logs.get_mut(key) {
            let before = log.subscribers.len();
            log.subscribers.retain(|sub| sub.id != id);
            if log.subscribers.len() != before {
                tracing::debug!("[{}] Log subscriber {} detached", key, id);
            }
        }
    }

    /// Snapshot of the retained entries for a session
    pub fn history(&self, key: &SessionKey) -> Vec<LogEntry> {
        self.logs
            .get(key)
            .map(|log| log.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live subscribers for a session
    pub fn subscriber_count(&self, key: &SessionKey) -> usize {
        match self.logs.get_mut(key) {
            Some(mut log) => {
                log.subscribers.retain(|sub| !sub.tx.is_closed());
                log.subscribers.len()
            }
            None => 0,
        }
    }

    /// Drop a session's buffer. Live subscriber streams end.
    pub fn remove(&self, key: &SessionKey) -> bool {
        self.logs.remove(key).is_some()
    }

    /// Number of sessions with a buffer
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

impl LogSubscription {
    /// Subscriber ID, for [`LogRegistry::unsubscribe`]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Session this subscription follows
    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    /// Wait for the next entry. `None` once the buffer is removed or the
    /// subscriber is detached.
    pub async fn recv(&mut self) -> Option<LogEntry> {
        self.rx.recv().await
    }

    /// Take an already-delivered entry without waiting
    pub fn try_recv(&mut self) -> Option<LogEntry> {
        self.rx.try_recv().ok()
    }

    /// Convert into a stream of entries
    pub fn into_stream(self) -> UnboundedReceiverStream<LogEntry> {
        UnboundedReceiverStream::new(self.rx)
    }
}
