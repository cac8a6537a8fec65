//! Streaming SSE tests for the debate endpoint.
//!
//! These tests verify fan-out dispatch, terminal event ordering and
//! fire-and-forget persistence through the full router.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_content(mock_server: &MockServer, chunks: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(common::sse_content_body(chunks))
                .insert_header("content-type", "text/event-stream"),
        )
        .mount(mock_server)
        .await;
}

fn debate_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/debate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_debate_returns_sse_content_type() {
    let mock_server = MockServer::start().await;
    mount_content(&mock_server, &["Hello"]).await;

    let (app, _) = common::make_app_with_mock(&mock_server, &["model-a", "model-b"]);

    let response = app
        .oneshot(debate_request(
            r#"{"prompt": "Hi", "models": ["model-a", "model-b"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/event-stream"));
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-cache, no-transform"
    );
}

#[tokio::test]
async fn test_debate_streams_chunks_then_all_complete() {
    let mock_server = MockServer::start().await;
    mount_content(&mock_server, &["Hello", " ", "world"]).await;

    let (app, _) = common::make_app_with_mock(&mock_server, &["model-a", "model-b"]);

    let response = app
        .oneshot(debate_request(
            r#"{"prompt": "Hi", "models": ["model-a", "model-b"]}"#,
        ))
        .await
        .unwrap();

    let body = common::body_to_string(response.into_body()).await;
    let events = common::parse_events(&body);
    let types = common::event_types(&events);

    // Three chunks per branch.
    assert_eq!(types.iter().filter(|t| *t == "chunk").count(), 6);
    // Exactly one terminal per branch and one final all_complete.
    assert_eq!(types.iter().filter(|t| *t == "model_complete").count(), 2);
    assert_eq!(types.iter().filter(|t| *t == "all_complete").count(), 1);
    assert_eq!(types.last().map(String::as_str), Some("all_complete"));

    // Latency payload rides on the terminal event.
    let terminal = events
        .iter()
        .find(|e| e["type"] == "model_complete")
        .unwrap();
    assert!(terminal["latency"]["total_ms"].is_u64());
}

#[tokio::test]
async fn test_debate_failed_branch_does_not_block_siblings() {
    let mock_server = MockServer::start().await;
    mount_content(&mock_server, &["ok"]).await;

    let failing_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&failing_server)
        .await;

    let mut config = common::make_config(&mock_server.uri(), &["model-a"]);
    config
        .providers
        .push(promptpit::config::ProviderConfig {
            name: "failing".to_string(),
            kind: promptpit::config::ProviderKind::OpenAi,
            base_url: failing_server.uri(),
            api_key_env: None,
            models: vec!["model-b".to_string()],
        });
    let (app, _) = common::make_app(config);

    let response = app
        .oneshot(debate_request(
            r#"{"prompt": "Hi", "models": ["model-a", "model-b"]}"#,
        ))
        .await
        .unwrap();

    let body = common::body_to_string(response.into_body()).await;
    let events = common::parse_events(&body);
    let types = common::event_types(&events);

    assert_eq!(types.iter().filter(|t| *t == "model_complete").count(), 1);
    assert_eq!(types.iter().filter(|t| *t == "error").count(), 1);
    assert_eq!(types.last().map(String::as_str), Some("all_complete"));

    let error = events.iter().find(|e| e["type"] == "error").unwrap();
    assert_eq!(error["model"], "model-b");
}

#[tokio::test]
async fn test_debate_persists_record() {
    let mock_server = MockServer::start().await;
    mount_content(&mock_server, &["persisted"]).await;

    let (app, store) = common::make_app_with_mock(&mock_server, &["model-a", "model-b"]);

    let response = app
        .oneshot(debate_request(
            r#"{"prompt": "Hi", "models": ["model-a", "model-b"]}"#,
        ))
        .await
        .unwrap();
    // Drain the stream so the dispatch completes.
    let _ = common::body_to_string(response.into_body()).await;

    // Persistence is fire-and-forget; poll briefly.
    let mut persisted = false;
    for _ in 0..50 {
        if store.debate_count() > 0 {
            persisted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(persisted, "Debate record was never persisted");

    let records = store.debates();
    assert_eq!(records[0].prompt, "Hi");
    assert_eq!(records[0].responses.len(), 2);
    assert!(records[0]
        .responses
        .iter()
        .all(|r| r.content == "persisted"));
}

#[tokio::test]
async fn test_debate_rejects_empty_prompt() {
    let mock_server = MockServer::start().await;
    let (app, _) = common::make_app_with_mock(&mock_server, &["model-a", "model-b"]);

    let response = app
        .oneshot(debate_request(
            r#"{"prompt": "  ", "models": ["model-a", "model-b"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_debate_rejects_single_model() {
    let mock_server = MockServer::start().await;
    let (app, _) = common::make_app_with_mock(&mock_server, &["model-a", "model-b"]);

    let response = app
        .oneshot(debate_request(r#"{"prompt": "Hi", "models": ["model-a"]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_debate_unknown_model_lists_available() {
    let mock_server = MockServer::start().await;
    let (app, _) = common::make_app_with_mock(&mock_server, &["model-a"]);

    let response = app
        .oneshot(debate_request(
            r#"{"prompt": "Hi", "models": ["model-a", "nope"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::body_to_string(response.into_body()).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"]["code"], "model_not_found");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("model-a"));
}

#[tokio::test]
async fn test_debate_rejects_too_many_models() {
    let mock_server = MockServer::start().await;
    let (app, _) = common::make_app_with_mock(
        &mock_server,
        &["m1", "m2", "m3", "m4", "m5"],
    );

    // Default max_models is 4.
    let response = app
        .oneshot(debate_request(
            r#"{"prompt": "Hi", "models": ["m1", "m2", "m3", "m4", "m5"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
