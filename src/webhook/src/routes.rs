//! Route definitions for the webhook server
//!
//! - `POST /mutate`: AdmissionReview endpoint registered with the
//!   MutatingWebhookConfiguration
//! - `GET /health`: liveness/readiness probe
//! - `GET /metrics`: Prometheus scrape endpoint

use crate::{handlers, middleware, server::ServerConfig, state::AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Create the application router with all routes and middleware
pub fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/mutate", post(handlers::mutate))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
        // Executed bottom to top
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout)))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
