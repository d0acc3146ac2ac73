//! Idle session retention task
//!
//! Sessions hold an open collaborator connection and a log buffer for as
//! long as they are registered. This task periodically tears down sessions
//! nobody has used for `retention.session_idle_ttl`:
//! - Sessions with a running broadcast are left alone
//! - Finished broadcast records older than the same TTL are dropped
//! - Credential files stay on disk

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Run the retention task until `cancel` fires.
pub async fn run_retention(state: Arc<AppState>, cancel: CancellationToken) {
    let retention = &state.config.retention;
    let mut interval = tokio::time::interval(retention.cleanup_interval);

    tracing::info!(
        "Starting retention task (idle ttl: {:?}, check interval: {:?})",
        retention.session_idle_ttl,
        retention.cleanup_interval
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep_idle_sessions(&state, retention.session_idle_ttl).await;
            }
            _ = cancel.cancelled() => {
                tracing::info!("Retention task shutting down");
                break;
            }
        }
    }
}

/// Tear down sessions idle for longer than `ttl` and prune old job records.
///
/// Returns the number of sessions torn down.
pub async fn sweep_idle_sessions(state: &AppState, ttl: Duration) -> usize {
    let mut cleaned_count = 0;

    for session in state.sessions.list() {
        let idle = session.idle_for();
        if idle <= ttl || state.jobs.has_running(&session.key) {
            continue;
        }

        tracing::info!(
            "Tearing down idle session {} (idle {:?}, state {:?})",
            session.key,
            idle,
            session.state()
        );
        if state.teardown_session(&session.key).await {
            cleaned_count += 1;
        }
    }

    let pruned = state.jobs.prune_finished(ttl);

    if cleaned_count > 0 || pruned > 0 {
        tracing::info!(
            "Retention sweep removed {} sessions and {} finished jobs",
            cleaned_count,
            pruned
        );
    }

    cleaned_count
}
