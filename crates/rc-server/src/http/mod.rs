//! HTTP API and web UI

mod error;
mod handlers;
mod sse;
mod ui;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub use error::ApiError;

/// Build the router with every page and API route
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/pairing", get(ui::pairing_page))
        .route("/broadcast", get(ui::broadcast_page).post(handlers::broadcast))
        .route("/pair", post(handlers::pair))
        .route("/logs/:session_key", get(sse::session_logs))
        .route("/get-token/:session_key", get(handlers::get_token))
        .route("/jobs/:job_id", get(handlers::job_status))
        .route(
            "/sessions/:session_key",
            get(handlers::session_status).delete(handlers::delete_session),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
}
