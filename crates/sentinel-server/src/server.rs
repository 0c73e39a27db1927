//! Router assembly and the serving loop.

use std::sync::Arc;
use std::time::Instant;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use sentinel_analytics::AnalyticsAggregator;
use sentinel_core::Result;
use sentinel_guard::SecurityGuard;
use sentinel_publisher::PublisherSimulator;
use sentinel_settings::ServerSettings;
use sentinel_store::{ContentStore, Store};

use crate::{auth, routes};

/// Shared state accessible from handlers.
#[derive(Clone)]
pub struct AppState {
    /// Pooled SQLite store.
    pub store: Arc<Store>,
    /// Read-only content collections.
    pub content: Arc<ContentStore>,
    /// Screening service for unscreened on-demand publishes.
    pub guard: Arc<SecurityGuard>,
    /// On-demand publish path.
    pub publisher: Arc<PublisherSimulator>,
    /// Suggestion snapshot reads.
    pub analytics: Arc<AnalyticsAggregator>,
    /// Serving configuration.
    pub settings: Arc<ServerSettings>,
    /// When the server started.
    pub start_time: Instant,
}

/// The pipeline's HTTP boundary.
pub struct SentinelServer {
    state: AppState,
}

impl SentinelServer {
    pub fn new(
        store: Arc<Store>,
        content: Arc<ContentStore>,
        guard: Arc<SecurityGuard>,
        publisher: Arc<PublisherSimulator>,
        analytics: Arc<AnalyticsAggregator>,
        settings: ServerSettings,
    ) -> Self {
        Self {
            state: AppState {
                store,
                content,
                guard,
                publisher,
                analytics,
                settings: Arc::new(settings),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the router. Login and health are open; everything else sits
    /// behind the bearer middleware.
    pub fn router(&self) -> Router {
        let protected = Router::new()
            .route("/content", get(routes::content))
            .route("/content/{id}/scores", get(routes::content_scores))
            .route("/alerts", get(routes::alerts))
            .route("/metrics", get(routes::metrics))
            .route("/suggestions", get(routes::suggestions))
            .route("/publish/{platform}", post(routes::trigger_publish))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::require_bearer,
            ));

        Router::new()
            .route("/health", get(routes::health))
            .route("/auth/login", post(auth::login))
            .merge(protected)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the task is cancelled.
    pub async fn serve(&self) -> Result<()> {
        let addr = format!("{}:{}", self.state.settings.host, self.state.settings.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr, "serving");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
