//! Read endpoints and the on-demand publish trigger.
//!
//! Read endpoints never fail on empty stores: an empty table or an unloaded
//! content directory serializes as an empty JSON collection.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use sentinel_analytics::StrategySuggestion;
use sentinel_core::{ContentId, ContentItem, Platform, SentinelError};
use sentinel_guard::{AlertRecord, AlertRepo, VerdictRepo};
use sentinel_publisher::{PublishRecord, PublishRecordRepo};

use crate::error::ApiError;
use crate::health::{health_check, HealthResponse};
use crate::server::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_check(state.start_time, state.content.len()))
}

/// GET /content — items grouped by language.
pub async fn content(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, Vec<ContentItem>>> {
    Json(state.content.by_language().clone())
}

/// GET /content/{id}/scores — the item's score set, or an empty object.
pub async fn content_scores(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Value> {
    match state.content.scores(&ContentId::from(id.as_str())) {
        Some(scores) => Json(json!(scores)),
        None => Json(json!({})),
    }
}

/// GET /alerts
pub async fn alerts(State(state): State<AppState>) -> Result<Json<Vec<AlertRecord>>, ApiError> {
    let list = state.store.read(AlertRepo::list)?;
    Ok(Json(list))
}

/// GET /metrics — publish records with their engagement metrics.
pub async fn metrics(State(state): State<AppState>) -> Result<Json<Vec<PublishRecord>>, ApiError> {
    let list = state.store.read(PublishRecordRepo::list)?;
    Ok(Json(list))
}

/// GET /suggestions
pub async fn suggestions(
    State(state): State<AppState>,
) -> Result<Json<Vec<StrategySuggestion>>, ApiError> {
    let list = state.analytics.current()?;
    Ok(Json(list))
}

/// Publish trigger request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub content_id: String,
}

/// POST /publish/{platform} — publish one item outside the due queue.
///
/// Unscreened items are screened on the spot; the verdict gate still
/// applies, so quarantined content is refused here exactly as it is in the
/// scheduler.
pub async fn trigger_publish(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<Value>, ApiError> {
    let platform = Platform::from_str_opt(&platform)
        .ok_or_else(|| SentinelError::Validation(format!("unknown platform {platform}")))?;
    let content_id = ContentId::from(req.content_id.as_str());
    let item = state
        .content
        .item(&content_id)
        .cloned()
        .ok_or_else(|| {
            SentinelError::Validation(format!("unknown content id {}", content_id.as_str()))
        })?;

    let verdict = match state
        .store
        .read(|conn| VerdictRepo::latest(conn, &content_id))?
    {
        Some(verdict) => verdict,
        None => state.guard.screen(&item)?,
    };
    if verdict.status.blocks_scheduling() {
        return Err(SentinelError::policy(content_id.as_str(), "content is quarantined").into());
    }

    let record = state.publisher.publish_on_demand(&content_id, platform)?;
    info!(
        content_id = content_id.as_str(),
        %platform,
        "on-demand publish succeeded"
    );
    Ok(Json(json!({
        "message": format!("published {} to {platform}", content_id.as_str()),
        "record": record,
    })))
}
