//! Quick endpoint: classify, route to one model, stream.

use super::{check_rate_limit, sse_response, ApiError, AppState, QuickRequest};
use crate::logging::generate_request_id;
use axum::{extract::State, http::HeaderMap, response::Response, Json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// POST /api/quick - Single-branch dispatch via preference routing.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<QuickRequest>,
) -> Result<Response, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt cannot be empty"));
    }

    if let Some(denied) =
        check_rate_limit(&state, &headers, "quick", state.config.limits.quick.policy())
    {
        return Ok(denied);
    }

    let request_id = generate_request_id();
    metrics::counter!("promptpit_requests_total", "endpoint" => "quick").increment(1);

    let cancel = CancellationToken::new();
    let route = state
        .quick
        .route(request.prompt, request.user, cancel.clone())
        .await;

    info!(
        request_id = %request_id,
        category = %route.category,
        model = %route.model,
        "Quick request routed"
    );

    Ok(sse_response(route.events, cancel.drop_guard()))
}
