//! Health check endpoint handler.

use crate::api::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub providers: usize,
    pub models: usize,
    pub rate_limiting: bool,
    pub store: bool,
}

/// GET /health - Return system health status.
///
/// Providers are static configuration, so "healthy" here means the server is
/// up and has at least one model to offer.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let providers = state.providers.clients().len();
    let models = state.providers.models().len();

    let status = if models > 0 { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.metrics_collector.uptime_seconds(),
        providers,
        models,
        rate_limiting: state.config.limits.enabled,
        store: state.config.store.enabled,
    })
}
