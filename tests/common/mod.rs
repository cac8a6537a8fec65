//! Shared test utilities for PromptPit integration tests.
//!
//! Provides helpers for building a test app backed by a wiremock provider
//! and for decoding SSE response bodies into events.

#![allow(dead_code)]

use promptpit::api::{create_router, AppState};
use promptpit::config::{PitConfig, ProviderConfig, ProviderKind};
use promptpit::provider::ProviderRegistry;
use promptpit::store::MemoryStore;
use std::sync::Arc;

/// Build a config with a single OpenAI-compatible provider pointing at the
/// mock server. Rate limiting and the persistence store are disabled unless
/// the caller turns them back on.
pub fn make_config(base_url: &str, models: &[&str]) -> PitConfig {
    let mut config = PitConfig::default();
    config.providers = vec![ProviderConfig {
        name: "mock".to_string(),
        kind: ProviderKind::OpenAi,
        base_url: base_url.to_string(),
        api_key_env: None,
        models: models.iter().map(|m| m.to_string()).collect(),
    }];
    config.limits.enabled = false;
    config.store.enabled = false;
    // Judge and quick default both resolve to mock-served models.
    config.arena.judge_model = "judge-model".to_string();
    config.arena.quick_default_model = "model-a".to_string();
    config
}

/// Create a test app from a config, returning the router and the in-memory
/// store so tests can observe persisted records.
pub fn make_app(config: PitConfig) -> (axum::Router, Arc<MemoryStore>) {
    let http_client = Arc::new(reqwest::Client::new());
    let providers = Arc::new(
        ProviderRegistry::from_config(&config.providers, http_client)
            .expect("test provider config is valid"),
    );
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(
        Arc::new(config),
        providers,
        store.clone() as Arc<dyn promptpit::store::DebateStore>,
    ));
    (create_router(state), store)
}

/// Create a test app backed by a mock server with the given models.
pub fn make_app_with_mock(
    mock_server: &wiremock::MockServer,
    models: &[&str],
) -> (axum::Router, Arc<MemoryStore>) {
    make_app(make_config(&mock_server.uri(), models))
}

/// Build an OpenAI-style SSE body of content chunks, terminated with [DONE].
pub fn sse_content_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for (i, content) in chunks.iter().enumerate() {
        body.push_str(&format!(
            "data: {{\"id\":\"c{}\",\"object\":\"chat.completion.chunk\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{}\"}},\"finish_reason\":null}}]}}\n\n",
            i, content
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Build an SSE frame carrying a single tool-call delta.
pub fn sse_tool_call_frame(index: u32, name: &str, arguments: &serde_json::Value) -> String {
    let escaped = serde_json::to_string(&arguments.to_string()).unwrap();
    format!(
        "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"tool_calls\":[{{\"index\":{},\"function\":{{\"name\":\"{}\",\"arguments\":{}}}}}]}},\"finish_reason\":null}}]}}\n\n",
        index, name, escaped
    )
}

/// Read an axum body to a string.
pub async fn body_to_string(body: axum::body::Body) -> String {
    use futures::StreamExt;
    let mut stream = body.into_data_stream();
    let mut result = String::new();
    while let Some(chunk) = stream.next().await {
        if let Ok(bytes) = chunk {
            result.push_str(&String::from_utf8_lossy(&bytes));
        }
    }
    result
}

/// Decode every `data:` line of an SSE body into JSON events.
pub fn parse_events(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|payload| serde_json::from_str(payload).ok())
        .collect()
}

/// Extract the `type` field of each decoded event.
pub fn event_types(events: &[serde_json::Value]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.get("type").and_then(|t| t.as_str()))
        .map(|t| t.to_string())
        .collect()
}
