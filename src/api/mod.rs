//! # HTTP API
//!
//! Browser-facing endpoints for the PromptPit arena.
//!
//! ## Endpoints
//!
//! - `POST /api/debate` - Fan-out dispatch across N models, SSE response
//! - `POST /api/judge` - Incremental judge/scorer relay, SSE response
//! - `POST /api/quick` - Preference-routed single-branch dispatch, SSE response
//! - `GET /health` - Liveness with provider counts
//! - `GET /metrics` - Prometheus text format metrics
//!
//! ## Request flow
//!
//! Every SSE endpoint follows the same order: validate the body, check the
//! rate limit, then stream. Validation failures are cheap JSON errors and
//! never consume rate-limit budget; the limit is charged before any
//! upstream call is made.
//!
//! ## Error format
//!
//! Errors use the OpenAI envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "Model 'gpt5' not found. Available: claude-sonnet-4",
//!     "type": "invalid_request_error",
//!     "param": "model",
//!     "code": "model_not_found"
//!   }
//! }
//! ```
//! except 429, which uses a flat `{error, message, retryAfter}` body.

mod debate;
mod health;
mod judge;
mod quick;
pub mod types;

pub use types::*;

use crate::arena::{Dispatcher, JudgeRelay, QuickRouter, StreamEvent};
use crate::config::PitConfig;
use crate::limit::{RateLimiter, RateLimitPolicy};
use crate::metrics::MetricsCollector;
use crate::provider::ProviderRegistry;
use crate::store::DebateStore;
use axum::{
    http::HeaderMap,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::DropGuard;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<PitConfig>,
    pub providers: Arc<ProviderRegistry>,
    pub dispatcher: Dispatcher,
    pub judge: JudgeRelay,
    pub quick: QuickRouter,
    pub limiter: Arc<RateLimiter>,
    pub store: Arc<dyn DebateStore>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    /// Metrics collector for observability
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    /// Create new application state from configuration, a built provider
    /// registry and a store implementation.
    pub fn new(
        config: Arc<PitConfig>,
        providers: Arc<ProviderRegistry>,
        store: Arc<dyn DebateStore>,
    ) -> Self {
        let branch_timeout = config
            .arena
            .branch_timeout_seconds
            .map(Duration::from_secs);
        let dispatcher = Dispatcher::new(Arc::clone(&providers), branch_timeout);
        let judge = JudgeRelay::new(Arc::clone(&providers), config.arena.judge_model.clone());
        let quick = QuickRouter::new(
            dispatcher.clone(),
            Arc::clone(&store),
            config.arena.quick_default_model.clone(),
        );

        let start_time = Instant::now();

        // Safe to call when a recorder is already installed (e.g. in tests):
        // fall back to a detached handle.
        let prometheus_handle = crate::metrics::setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, creating new handle: {}", e);
            crate::metrics::PrometheusBuilder::new()
                .build_recorder()
                .handle()
        });

        let metrics_collector = Arc::new(MetricsCollector::new(
            Arc::clone(&providers),
            start_time,
            prometheus_handle,
        ));
        metrics_collector.update_provider_gauges();

        Self {
            config,
            providers,
            dispatcher,
            judge,
            quick,
            limiter: Arc::new(RateLimiter::new()),
            store,
            start_time,
            metrics_collector,
        }
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_body_bytes;
    Router::new()
        .route("/api/debate", post(debate::handle))
        .route("/api/judge", post(judge::handle))
        .route("/api/quick", post(quick::handle))
        .route("/health", get(health::handle))
        .route("/metrics", get(metrics_handler))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /metrics - Prometheus text format.
async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Response {
    let body = state.metrics_collector.render_metrics();
    ([("content-type", "text/plain; version=0.0.4")], body).into_response()
}

/// Check the fixed-window limit for one endpoint. Returns the ready-made
/// 429 response when the caller is over budget.
pub(crate) fn check_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    endpoint: &str,
    policy: RateLimitPolicy,
) -> Option<Response> {
    if !state.config.limits.enabled {
        return None;
    }

    let identifier = crate::limit::identifier(headers, endpoint);
    let decision = state.limiter.check(&identifier, policy);
    if decision.allowed {
        return None;
    }

    tracing::warn!(identifier = %identifier, endpoint, "Rate limit exceeded");
    metrics::counter!("promptpit_rate_limited_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
    Some(types::rate_limited_response(&decision))
}

/// Wrap an event stream as an SSE response.
///
/// The drop guard rides inside the stream: when the client disconnects axum
/// drops the body, the guard fires and every in-flight upstream call is
/// cancelled. Encode-then-write per frame keeps frames atomic.
pub(crate) fn sse_response<S>(events: S, guard: DropGuard) -> Response
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    let stream = events.map(move |event| {
        let _held = &guard;
        tracing::trace!(kind = crate::logging::event_kind(&event), "Relaying event");
        Ok::<_, Infallible>(
            Event::default().data(serde_json::to_string(&event).unwrap_or_default()),
        )
    });

    let mut response = Sse::new(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(
        "cache-control",
        axum::http::HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert(
        "connection",
        axum::http::HeaderValue::from_static("keep-alive"),
    );
    response
}
