//! Request and response types for the browser-facing API.
//!
//! Request bodies use camelCase to match the JavaScript client; error
//! responses use the OpenAI error envelope except for rate limiting, which
//! keeps its own flat shape.

use crate::arena::{PreviousRound, RoundResponse};
use crate::limit::RateLimitDecision;
use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// POST /api/debate request body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateRequest {
    pub prompt: String,
    pub models: Vec<String>,
    #[serde(default)]
    pub previous_rounds: Vec<PreviousRound>,
    #[serde(default = "default_round_number")]
    pub round_number: u32,
}

fn default_round_number() -> u32 {
    1
}

/// POST /api/judge request body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    pub prompt: String,
    pub responses: Vec<RoundResponse>,
    /// Arena flavor steering the rubric: debate, code or writing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arena: Option<String>,
    /// Debate row to attach the judgement to, as returned in the debate
    /// response's `x-debate-id` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debate_id: Option<Uuid>,
}

/// POST /api/quick request body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRequest {
    pub prompt: String,
    /// Identified user for preference routing; omit for anonymous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// API error response in OpenAI envelope format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: "invalid_request_error".to_string(),
                param: None,
                code: Some("invalid_request_error".to_string()),
            },
        }
    }

    /// Create a model not found error (404) with available models hint.
    pub fn model_not_found(model: &str, available: &[String]) -> Self {
        let hint = if available.is_empty() {
            "No models available".to_string()
        } else {
            format!("Available: {}", available.join(", "))
        };
        Self {
            error: ApiErrorBody {
                message: format!("Model '{}' not found. {}", model, hint),
                r#type: "invalid_request_error".to_string(),
                param: Some("model".to_string()),
                code: Some("model_not_found".to_string()),
            },
        }
    }

    /// Create a service unavailable error (503).
    pub fn service_unavailable(message: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: "server_error".to_string(),
                param: None,
                code: Some("service_unavailable".to_string()),
            },
        }
    }

    /// Get the HTTP status code for this error.
    fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("model_not_found") => StatusCode::NOT_FOUND,
            Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// 429 body. Flat camelCase shape, distinct from the OpenAI envelope,
/// matching what the browser client's limit banner expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitBody {
    pub error: String,
    pub message: String,
    pub retry_after: u64,
}

/// Build the 429 response with X-RateLimit-* and Retry-After headers.
pub fn rate_limited_response(decision: &RateLimitDecision) -> Response {
    let retry_after = decision.retry_after.unwrap_or(1);
    let body = RateLimitBody {
        error: "Too Many Requests".to_string(),
        message: format!(
            "Rate limit exceeded. Try again in {} second{}.",
            retry_after,
            if retry_after == 1 { "" } else { "s" }
        ),
        retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", header_number(decision.limit as u64));
    headers.insert(
        "x-ratelimit-remaining",
        header_number(decision.remaining as u64),
    );
    headers.insert(
        "x-ratelimit-reset",
        header_number(decision.reset_after.as_secs()),
    );
    headers.insert("retry-after", header_number(retry_after));
    response
}

fn header_number(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}
