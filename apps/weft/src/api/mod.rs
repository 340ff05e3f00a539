//! # weft HTTP API Module
//!
//! JSON API over one shared `Session`, used by visualization front-ends.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (never authenticated)
//! - `GET|POST /graphs` - List / create graphs
//! - `GET /graphs/{id}` - Live graph
//! - `POST /graphs/{id}/nodes`, `PATCH|DELETE /graphs/{id}/nodes/{node_id}`
//! - `POST /graphs/{id}/edges`, `PATCH|DELETE /graphs/{id}/edges/{edge_id}`
//! - `POST /graphs/{id}/layout` - Apply a named layout
//! - `GET|POST /graphs/{id}/snapshots` - List (`?start=&end=`) / record
//! - `GET /graphs/{id}/state?at=` - Point-in-time reconstruction
//! - `POST /graphs/{id}/revert` - Revert to a snapshot
//! - `GET|POST /graphs/{id}/highlights`, `POST /graphs/{id}/highlights/shortest`
//! - `DELETE /graphs/{id}/highlights/{highlight_id}`
//! - `GET /snapshots/{id}`, `GET /snapshots/{a}/compare/{b}`
//!
//! ## Security Configuration (`[server]`)
//!
//! - `cors_origins`: allowed origins, or `["*"]` for all (default: localhost only)
//! - `rate_limit`: requests per second (default: 100, 0 to disable)
//! - `api_key`: if set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::keys_match;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, ApiResponse, ApiResult, AppliedResponse, ClearedResponse, CreateGraphRequest,
    HealthResponse, HighlightRequest, LayoutRequest, RecordSnapshotRequest, RemovedResponse,
    RevertRequest, RevertedResponse, ShortestPathRequest, SnapshotCreatedResponse,
    SnapshotRangeQuery, StateQuery,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use weft_core::{Session, WeftError};

/// Maximum accepted request body.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the engine session.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `server.cors_origins`.
///
/// `["*"]` is permissive. Unparseable origins are skipped; if none remain the
/// layer falls back to localhost only.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o.trim() == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }

    let mut allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => {
                tracing::info!(origin = %origin, "CORS: Allowing origin");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "CORS: Invalid origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        allowed = ["http://localhost:3000", "http://127.0.0.1:3000"]
            .into_iter()
            .map(HeaderValue::from_static)
            .collect();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - if `rate_limit > 0`
/// 5. Authentication - if an API key is configured
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/graphs",
            get(handlers::list_graphs_handler).post(handlers::create_graph_handler),
        )
        .route("/graphs/{id}", get(handlers::get_graph_handler))
        .route("/graphs/{id}/nodes", post(handlers::add_node_handler))
        .route(
            "/graphs/{id}/nodes/{node_id}",
            patch(handlers::update_node_handler).delete(handlers::remove_node_handler),
        )
        .route("/graphs/{id}/edges", post(handlers::add_edge_handler))
        .route(
            "/graphs/{id}/edges/{edge_id}",
            patch(handlers::update_edge_handler).delete(handlers::remove_edge_handler),
        )
        .route("/graphs/{id}/layout", post(handlers::apply_layout_handler))
        .route(
            "/graphs/{id}/snapshots",
            get(handlers::list_snapshots_handler).post(handlers::record_snapshot_handler),
        )
        .route("/graphs/{id}/state", get(handlers::graph_state_handler))
        .route("/graphs/{id}/revert", post(handlers::revert_handler))
        .route(
            "/graphs/{id}/highlights",
            get(handlers::list_highlights_handler).post(handlers::highlight_path_handler),
        )
        .route(
            "/graphs/{id}/highlights/shortest",
            post(handlers::highlight_shortest_handler),
        )
        .route(
            "/graphs/{id}/highlights/{highlight_id}",
            delete(handlers::clear_highlight_handler),
        )
        .route("/snapshots/{id}", get(handlers::get_snapshot_handler))
        .route(
            "/snapshots/{id}/compare/{other}",
            get(handlers::compare_snapshots_handler),
        );

    // Innermost: runs last on the way in.
    match config.api_key() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            let key: auth::ApiKey = Arc::from(key);
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set server.api_key or WEFT_API_KEY to enable authentication."
        ),
    }

    match create_rate_limiter(config.rate_limit) {
        Some(limiter) => {
            tracing::info!(rps = config.rate_limit, "Rate limiting enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(BODY_LIMIT))
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve the API until Ctrl+C.
pub async fn run_server(config: &ServerConfig, session: Session) -> Result<(), WeftError> {
    let router = create_router(AppState::new(session), config);
    let addr = config.addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WeftError::Io(format!("Bind {addr} failed: {e}")))?;

    tracing::info!(%addr, "weft HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WeftError::Io(format!("Server error: {e}")))
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
