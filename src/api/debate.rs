//! Debate endpoint: fan-out dispatch with SSE relay.

use super::{check_rate_limit, sse_response, ApiError, AppState, DebateRequest};
use crate::arena::DispatchSpec;
use crate::logging::{generate_request_id, truncate_prompt};
use crate::store::DebateRecord;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// POST /api/debate - Stream N concurrent model branches.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DebateRequest>,
) -> Result<Response, ApiError> {
    validate(&state, &request)?;

    if let Some(denied) =
        check_rate_limit(&state, &headers, "debate", state.config.limits.debate.policy())
    {
        return Ok(denied);
    }

    let request_id = generate_request_id();
    let debate_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        models = ?request.models,
        round = request.round_number,
        prompt_preview = truncate_prompt(
            &request.prompt,
            state.config.logging.enable_content_logging
        ),
        "Debate request"
    );
    metrics::counter!("promptpit_requests_total", "endpoint" => "debate").increment(1);

    let spec = DispatchSpec {
        prompt: request.prompt.clone(),
        models: request.models,
        previous_rounds: request.previous_rounds,
        round_number: request.round_number,
    };

    let cancel = CancellationToken::new();
    let handle = state.dispatcher.dispatch(spec, cancel.clone());

    // Fire-and-forget persistence once every branch is terminal. The record
    // id is minted up front and echoed in the x-debate-id header so a later
    // judge call can attach its scores to this row.
    let store = Arc::clone(&state.store);
    let prompt = request.prompt;
    tokio::spawn(async move {
        let Ok(branches) = handle.finished.await else {
            return;
        };
        let mut record = DebateRecord::from_branches(prompt, &branches);
        record.id = debate_id;
        if !record.has_output() {
            return;
        }
        if let Err(e) = store.insert_debate(&record).await {
            warn!(request_id = %request_id, error = %e, "Failed to persist debate");
        }
    });

    let mut response = sse_response(handle.events, cancel.drop_guard());
    if let Ok(value) = HeaderValue::from_str(&debate_id.to_string()) {
        response.headers_mut().insert("x-debate-id", value);
    }
    Ok(response)
}

fn validate(state: &AppState, request: &DebateRequest) -> Result<(), ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt cannot be empty"));
    }
    if request.models.len() < 2 {
        return Err(ApiError::bad_request("a debate needs at least two models"));
    }

    let max_models = state.config.arena.max_models;
    if request.models.len() > max_models {
        return Err(ApiError::bad_request(&format!(
            "at most {} models per debate",
            max_models
        )));
    }
    if request.round_number == 0 {
        return Err(ApiError::bad_request("roundNumber starts at 1"));
    }

    for model in &request.models {
        if !state.providers.knows_model(model) {
            return Err(ApiError::model_not_found(model, &state.providers.models()));
        }
    }

    Ok(())
}
