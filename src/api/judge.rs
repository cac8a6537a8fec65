//! Judge endpoint: tool-calling scorer relay.

use super::{check_rate_limit, sse_response, ApiError, AppState, JudgeRequest};
use crate::arena::{JudgeHandle, JudgeSpec};
use crate::logging::generate_request_id;
use axum::{extract::State, http::HeaderMap, response::Response, Json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const ARENAS: &[&str] = &["debate", "code", "writing"];

/// POST /api/judge - Score completed responses through the judge model.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<JudgeRequest>,
) -> Result<Response, ApiError> {
    validate(&state, &request)?;

    if let Some(denied) =
        check_rate_limit(&state, &headers, "judge", state.config.limits.judge.policy())
    {
        return Ok(denied);
    }

    let request_id = generate_request_id();
    info!(
        request_id = %request_id,
        judge = state.judge.judge_model(),
        responses = request.responses.len(),
        arena = request.arena.as_deref().unwrap_or("general"),
        "Judge request"
    );
    metrics::counter!("promptpit_requests_total", "endpoint" => "judge").increment(1);

    let debate_id = request.debate_id;
    let spec = JudgeSpec {
        prompt: request.prompt,
        responses: request.responses,
        arena: request.arena,
    };

    let cancel = CancellationToken::new();
    let JudgeHandle { events, finished } = state.judge.judge(spec, cancel.clone());

    // When the caller named a debate row, write the judgement back to it
    // once the pass is over. Fire-and-forget, same as debate persistence.
    if let Some(debate_id) = debate_id {
        let store = Arc::clone(&state.store);
        tokio::spawn(async move {
            let Ok((scores, verdict)) = finished.await else {
                return;
            };
            if scores.is_empty() && verdict.is_none() {
                return;
            }
            if let Err(e) = store
                .attach_judgement(debate_id, &scores, verdict.as_ref())
                .await
            {
                warn!(request_id = %request_id, error = %e, "Failed to attach judgement");
            }
        });
    }

    Ok(sse_response(events, cancel.drop_guard()))
}

fn validate(state: &AppState, request: &JudgeRequest) -> Result<(), ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt cannot be empty"));
    }
    if request.responses.len() < 2 {
        return Err(ApiError::bad_request(
            "at least two responses are required to judge",
        ));
    }
    if let Some(arena) = &request.arena {
        if !ARENAS.contains(&arena.as_str()) {
            return Err(ApiError::bad_request(&format!(
                "unknown arena '{}'; expected one of: {}",
                arena,
                ARENAS.join(", ")
            )));
        }
    }
    if !state.providers.knows_model(state.judge.judge_model()) {
        return Err(ApiError::service_unavailable(
            "judge model is not served by any configured provider",
        ));
    }
    Ok(())
}
