//! Live session log stream

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_stream::StreamExt;

use rc_core::SessionKey;

use super::error::ApiError;
use crate::state::AppState;

/// GET /logs/:session_key: backlog first, then live entries
pub(super) async fn session_logs(
    State(state): State<Arc<AppState>>,
    Path(session_key): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let key = SessionKey::parse(&session_key)?;
    state.sessions.get(&key)?;

    let subscription = state.logs.subscribe(&key);
    tracing::debug!("[{}] SSE viewer {} connected", key, subscription.id());

    let stream = subscription
        .into_stream()
        .filter_map(|entry| match Event::default().json_data(&entry) {
            Ok(event) => Some(Ok::<_, Infallible>(event)),
            Err(e) => {
                tracing::warn!("Failed to encode log entry: {}", e);
                None
            }
        });

    // Open viewers end when the server shuts down
    let shutdown = state.shutdown.clone();
    let stream = futures::StreamExt::take_until(stream, async move {
        shutdown.cancelled().await;
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
