//! HTTP error mapping.
//!
//! Client faults (validation, policy, duplicate, authentication) map to
//! 4xx statuses; everything else is a server fault. The body always carries
//! a stable `error` tag plus the human-readable message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use sentinel_core::SentinelError;

/// Response-side wrapper for pipeline errors.
#[derive(Debug)]
pub struct ApiError(pub SentinelError);

impl From<SentinelError> for ApiError {
    fn from(err: SentinelError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            SentinelError::Validation(_) => StatusCode::BAD_REQUEST,
            SentinelError::Authentication(_) => StatusCode::UNAUTHORIZED,
            SentinelError::Policy { .. } => StatusCode::FORBIDDEN,
            SentinelError::Duplicate { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn tag(&self) -> &'static str {
        match &self.0 {
            SentinelError::Validation(_) => "validation",
            SentinelError::Authentication(_) => "authentication",
            SentinelError::Policy { .. } => "policy",
            SentinelError::Duplicate { .. } => "duplicate",
            SentinelError::TransientPublish { .. } => "transient-publish",
            SentinelError::Encryption(_) => "encryption",
            SentinelError::Wiped => "wiped",
            _ => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = json!({
            "error": self.tag(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
