//! Login exchange and bearer-token middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;

use sentinel_core::SentinelError;
use sentinel_publisher::{BearerTokenSource, PublisherClaims};

use crate::error::ApiError;
use crate::server::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let settings = &state.settings;
    let expected_password = std::env::var(&settings.login_password_env)
        .map_err(|_| SentinelError::Authentication("login is not configured".to_string()))?;
    if req.email != settings.login_email || req.password != expected_password {
        return Err(SentinelError::Authentication("invalid credentials".to_string()).into());
    }

    let source = BearerTokenSource::new(&settings.jwt_secret_env, settings.token_ttl_secs);
    let token = source.issue()?;
    info!(email = req.email, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        expires_in: settings.token_ttl_secs,
    }))
}

/// Bearer middleware guarding every endpoint except login and health.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| SentinelError::Authentication("missing bearer token".to_string()))?;

    let secret = std::env::var(&state.settings.jwt_secret_env)
        .map_err(|_| SentinelError::Authentication("token verification unavailable".to_string()))?;
    let _ = decode::<PublisherClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| SentinelError::Authentication(format!("invalid token: {e}")))?;

    Ok(next.run(request).await)
}
