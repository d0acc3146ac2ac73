//! Broadcast job tracking
//!
//! Every broadcast runs detached from the request that started it. The job
//! registry keeps a live status snapshot per job so callers can poll for
//! progress or wait for completion.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use rc_core::time::{current_time_millis, elapsed_duration};
use rc_core::traits::MessagingClient;
use rc_core::SessionKey;

use super::runner::{run_broadcast, BroadcastJob};
use crate::logs::LogRegistry;
use crate::session::Session;

/// Job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Finished,
}

/// Point-in-time view of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: Uuid,
    pub session_key: SessionKey,
    pub state: JobState,
    /// Planned send attempts (targets × messages)
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub started_at: u64,
    pub finished_at: Option<u64>,
}

/// Handle to a running or finished broadcast
pub struct JobHandle {
    /// Job ID
    pub id: Uuid,
    /// Session the job sends through
    pub session_key: SessionKey,
    status: watch::Sender<JobStatus>,
}

impl JobHandle {
    fn new(session_key: SessionKey, total: usize) -> Self {
        let id = Uuid::new_v4();
        let (status, _) = watch::channel(JobStatus {
            job_id: id,
            session_key: session_key.clone(),
            state: JobState::Running,
            total,
            sent: 0,
            failed: 0,
            started_at: current_time_millis(),
            finished_at: None,
        });
        Self {
            id,
            session_key,
            status,
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> JobStatus {
        self.status.borrow().clone()
    }

    /// Whether the job has finished
    pub fn is_finished(&self) -> bool {
        self.status.borrow().state == JobState::Finished
    }

    /// Wait until the job finishes and return its final status
    pub async fn wait(&self) -> JobStatus {
        let mut rx = self.status.subscribe();
        let status = match rx.wait_for(|s| s.state == JobState::Finished).await {
            Ok(status) => status.clone(),
            // Sender lives in self, so this only happens while tearing down
            Err(_) => self.status(),
        };
        status
    }

    pub(crate) fn record_sent(&self) {
        self.status.send_modify(|s| s.sent += 1);
    }

    pub(crate) fn record_failed(&self, count: usize) {
        self.status.send_modify(|s| s.failed += count);
    }

    pub(crate) fn finish(&self) {
        self.status.send_modify(|s| {
            s.state = JobState::Finished;
            s.finished_at = Some(current_time_millis());
        });
    }
}

/// Registry of broadcast jobs indexed by job ID
pub struct JobRegistry {
    jobs: DashMap<Uuid, Arc<JobHandle>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    /// Register a job and start it on a background task
    pub fn spawn(
        &self,
        session: Arc<Session>,
        client: Arc<dyn MessagingClient>,
        logs: Arc<LogRegistry>,
        job: BroadcastJob,
    ) -> Arc<JobHandle> {
        let handle = Arc::new(JobHandle::new(session.key.clone(), job.total()));
        self.jobs.insert(handle.id, Arc::clone(&handle));

        tracing::info!(
            "Starting broadcast job {} on session {} ({} sends)",
            handle.id,
            session.key,
            job.total()
        );

        let task_handle = Arc::clone(&handle);
        tokio::spawn(async move {
            run_broadcast(&session, client, &logs, &job, &task_handle).await;
            tracing::info!("Broadcast job {} finished", task_handle.id);
        });

        handle
    }

    /// Get a job by ID
    pub fn get(&self, id: &Uuid) -> Option<Arc<JobHandle>> {
        self.jobs.get(id).map(|r| Arc::clone(&r))
    }

    /// Jobs started on a session
    pub fn list_for_session(&self, key: &SessionKey) -> Vec<Arc<JobHandle>> {
        self.jobs
            .iter()
            .filter(|r| &r.session_key == key)
            .map(|r| Arc::clone(&r))
            .collect()
    }

    /// Whether a session has a job still running
    pub fn has_running(&self, key: &SessionKey) -> bool {
        self.jobs
            .iter()
            .any(|r| &r.session_key == key && !r.is_finished())
    }

    /// Drop every job record of a session. Running tasks are not stopped.
    pub fn forget_session(&self, key: &SessionKey) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| &job.session_key != key);
        before - self.jobs.len()
    }

    /// Drop finished jobs that ended more than `older_than` ago
    pub fn prune_finished(&self, older_than: Duration) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| match job.status().finished_at {
            Some(finished_at) => elapsed_duration(finished_at) <= older_than,
            None => true,
        });
        before - self.jobs.len()
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionRegistry, SessionState};
    use crate::test_support::FakeClient;
    use rc_core::TargetType;

    fn job(targets: &[&str], messages: &[&str]) -> BroadcastJob {
        BroadcastJob {
            target_type: TargetType::User,
            targets: targets.iter().map(|s| s.to_string()).collect(),
            messages: messages.iter().map(|s| s.to_string()).collect(),
            mentions: vec![],
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_spawn_tracks_until_finished() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionRegistry::new(dir.path());
        let session = sessions.create("1").await.unwrap();
        session.set_state(SessionState::Connected);

        let logs = Arc::new(LogRegistry::new(100));
        let jobs = JobRegistry::new();
        let client = FakeClient::registered();

        let handle = jobs.spawn(
            Arc::clone(&session),
            client.clone(),
            logs,
            job(&["1", "2"], &["a", "b", "c"]),
        );
        assert_eq!(handle.status().total, 6);

        let status = handle.wait().await;
        assert_eq!(status.state, JobState::Finished);
        assert_eq!(status.sent, 6);
        assert_eq!(status.failed, 0);
        assert!(status.finished_at.is_some());
        assert!(!jobs.has_running(&session.key));
        assert_eq!(jobs.list_for_session(&session.key).len(), 1);
        assert!(jobs.get(&handle.id).is_some());
    }

    #[tokio::test]
    async fn test_forget_and_prune() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionRegistry::new(dir.path());
        let a = sessions.create("1").await.unwrap();
        let b = sessions.create("2").await.unwrap();
        a.set_state(SessionState::Connected);
        b.set_state(SessionState::Connected);

        let logs = Arc::new(LogRegistry::new(100));
        let jobs = JobRegistry::new();
        let client = FakeClient::registered();

        let ha = jobs.spawn(Arc::clone(&a), client.clone(), Arc::clone(&logs), job(&["1"], &["x"]));
        let hb = jobs.spawn(Arc::clone(&b), client.clone(), Arc::clone(&logs), job(&["1"], &["x"]));
        ha.wait().await;
        hb.wait().await;

        assert_eq!(jobs.forget_session(&a.key), 1);
        assert_eq!(jobs.len(), 1);

        // Finished just now: kept with a long horizon, dropped with none
        assert_eq!(jobs.prune_finished(Duration::from_secs(3600)), 0);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(jobs.prune_finished(Duration::ZERO), 1);
        assert!(jobs.is_empty());
    }
}
