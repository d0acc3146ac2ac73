//! API handlers

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rc_core::error::SessionError;
use rc_core::{SessionKey, TargetType};

use super::error::ApiError;
use crate::broadcast::{BroadcastJob, JobStatus};
use crate::session::SessionState;
use crate::state::AppState;

const SESSION_NOT_ACTIVE: &str = "Session not active";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PairRequest {
    #[serde(default)]
    phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PairResponse {
    session_key: SessionKey,
}

/// POST /pair
pub(super) async fn pair(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PairRequest>, JsonRejection>,
) -> Result<Json<PairResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let phone_number = request
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Phone number required"))?;

    let session = state
        .start_session(phone_number)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!("Pairing session {} started for {}", session.key, phone_number);

    Ok(Json(PairResponse {
        session_key: session.key.clone(),
    }))
}

/// GET /get-token/:session_key
pub(super) async fn get_token(
    State(state): State<Arc<AppState>>,
    Path(session_key): Path<String>,
) -> Response {
    let token = match SessionKey::parse(&session_key) {
        Ok(key) => state.sessions.credentials_token(&key).await,
        Err(e) => Err(e),
    };

    match token {
        Ok(token) => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], token).into_response(),
        Err(SessionError::NotFound(_)) | Err(SessionError::CredentialsMissing(_)) => {
            (StatusCode::NOT_FOUND, "Not paired yet.").into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Fields of the broadcast form. Everything arrives as text.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BroadcastForm {
    session_key: Option<String>,
    target_type: Option<String>,
    /// Comma-separated
    targets: Option<String>,
    /// JSON array of strings
    messages: Option<String>,
    /// JSON array of strings
    mentions: Option<String>,
    /// Milliseconds
    delay: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BroadcastResponse {
    status: &'static str,
    job_id: Uuid,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_list(field: &str, raw: &str) -> Result<Vec<String>, ApiError> {
    serde_json::from_str(raw).map_err(|e| ApiError::bad_request(format!("Invalid {}: {}", field, e)))
}

/// Missing, unparseable and zero delays fall back to the configured default
fn parse_delay(raw: Option<&str>, default: Duration) -> Duration {
    match raw.and_then(|d| d.parse::<u64>().ok()) {
        Some(ms) if ms > 0 => Duration::from_millis(ms),
        _ => default,
    }
}

/// POST /broadcast
pub(super) async fn broadcast(
    State(state): State<Arc<AppState>>,
    form: Result<Form<BroadcastForm>, FormRejection>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let (Some(session_key), Some(targets), Some(messages)) = (
        non_blank(&form.session_key),
        non_blank(&form.targets),
        non_blank(&form.messages),
    ) else {
        return Err(ApiError::bad_request("Missing data"));
    };

    let targets: Vec<String> = targets
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if targets.is_empty() {
        return Err(ApiError::bad_request("Missing data"));
    }

    let messages = parse_list("messages", messages)?;
    let mentions = match non_blank(&form.mentions) {
        Some(raw) => parse_list("mentions", raw)?,
        None => Vec::new(),
    };

    let job = BroadcastJob {
        target_type: form
            .target_type
            .as_deref()
            .map(TargetType::from)
            .unwrap_or_default(),
        targets,
        messages,
        mentions,
        delay: parse_delay(non_blank(&form.delay), state.config.default_delay),
    };

    let key = SessionKey::parse(session_key)
        .map_err(|_| ApiError::bad_request(SESSION_NOT_ACTIVE))?;
    let handle = state
        .start_broadcast(&key, job)
        .map_err(|e| match e {
            SessionError::NotFound(_) | SessionError::NotActive(_) => {
                ApiError::bad_request(SESSION_NOT_ACTIVE)
            }
            other => ApiError::from(other),
        })?;

    Ok(Json(BroadcastResponse {
        status: "Broadcast started",
        job_id: handle.id,
    }))
}

/// GET /jobs/:job_id
pub(super) async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Job not found: {}", job_id));

    let id = Uuid::parse_str(&job_id).map_err(|_| not_found())?;
    let handle = state.jobs.get(&id).ok_or_else(not_found)?;
    Ok(Json(handle.status()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SessionStatus {
    session_key: SessionKey,
    state: SessionState,
    pairing_requested: bool,
    created_at: u64,
    subscribers: usize,
}

/// GET /sessions/:session_key
pub(super) async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(session_key): Path<String>,
) -> Result<Json<SessionStatus>, ApiError> {
    let key = SessionKey::parse(&session_key)?;
    let session = state.sessions.get(&key)?;

    Ok(Json(SessionStatus {
        session_key: key.clone(),
        state: session.state(),
        pairing_requested: session.pairing_requested(),
        created_at: session.created_at,
        subscribers: state.logs.subscriber_count(&key),
    }))
}

/// DELETE /sessions/:session_key
pub(super) async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let key = SessionKey::parse(&session_key)?;
    if state.teardown_session(&key).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SessionError::NotFound(key.to_string()).into())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Health {
    status: &'static str,
    version: &'static str,
    sessions: usize,
    uptime_secs: u64,
}

/// GET /health
pub(super) async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.len(),
        uptime_secs: state.uptime().as_secs(),
    })
}
