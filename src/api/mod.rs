//! REST API for dashboards
//!
//! Serves the synced data read-only and lets operators trigger a run.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Store handle** for read queries against the entity store
//! - **Scheduler handle** for on-demand runs and run status
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/stats` - Store totals and scheduler status
//! - `GET /api/v1/hosts` - Stored hosts
//! - `GET /api/v1/chart_data?host_id=..&category=..` - Readable history of a host's category
//! - `POST /api/v1/feedback` - Record user feedback
//! - `POST /api/v1/sync` - Run a sync now
//! - `GET /api/v1/sync/status` - Scheduler bookkeeping

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{FeedbackRequest, FeedbackResponse, HealthResponse, HostInfo, StatsResponse};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
#[cfg(feature = "api")]
use tracing::info;

use crate::config::ApiSection;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    pub bind_addr: SocketAddr,

    /// Optional bearer token
    pub auth_token: Option<String>,

    /// Enable CORS for dashboards served from another origin
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            auth_token: None,
            enable_cors: true,
        }
    }
}

impl From<&ApiSection> for ApiConfig {
    fn from(section: &ApiSection) -> Self {
        Self {
            bind_addr: section.bind,
            auth_token: section.token.clone(),
            enable_cors: section.enable_cors,
        }
    }
}

/// Build the router with every route and layer
#[cfg(feature = "api")]
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route("/api/v1/hosts", get(routes::hosts::list_hosts))
        .route("/api/v1/chart_data", get(routes::chart::chart_data))
        .route("/api/v1/feedback", post(routes::feedback::submit_feedback))
        .route("/api/v1/sync", post(routes::sync::trigger_sync))
        .route("/api/v1/sync/status", get(routes::sync::sync_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(token) = config.auth_token.clone() {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    // outermost, so preflight requests are answered before authentication
    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// Starts an Axum HTTP server in a background task and returns the
/// address it is bound to (useful with port 0).
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
