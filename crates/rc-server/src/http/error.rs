//! API error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use rc_core::error::SessionError;

/// Error returned by API handlers, rendered as `{"error": "..."}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad user input
    #[error("{0}")]
    BadRequest(String),

    /// Unknown resource
    #[error("{0}")]
    NotFound(String),

    /// Unexpected server-side failure
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) | SessionError::CredentialsMissing(_) => {
                ApiError::NotFound(err.to_string())
            }
            SessionError::NotActive(_) => ApiError::BadRequest(err.to_string()),
            SessionError::Storage(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_mapping() {
        let err: ApiError = SessionError::NotFound("abc".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = SessionError::NotActive("abc".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ApiError = SessionError::Storage(io).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
