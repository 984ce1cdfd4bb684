use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::{
    error::{ApiError, Result},
    state::AppState,
    HealthResponse,
};

/// Mutate endpoint called by the API server for Pod admission
pub async fn mutate(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    let reply = state.handler.decide(&body).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        reply,
    )
        .into_response())
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> Result<Response> {
    let text = state
        .metrics()
        .render()
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}
