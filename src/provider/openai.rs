//! OpenAI-compatible provider client.
//!
//! Speaks the chat-completions streaming protocol, which is also the wire
//! format exposed by most self-hosted gateways, so this client doubles as the
//! "generic" provider for any OpenAI-compatible base URL.

use super::{ChatRequest, ProviderClient, ProviderError, ProviderEvent};
use crate::sse::SseParser;
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Streaming request timeout. Generation can be slow; this bounds the whole
/// call, not individual reads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI-compatible provider client.
///
/// - Chat completion via POST /v1/chat/completions with Bearer token
/// - Token deltas decoded from `choices[].delta.content`
/// - Tool invocations assembled from index-keyed `delta.tool_calls` fragments
pub struct OpenAiClient {
    /// Configured provider name
    name: String,
    /// Base URL (e.g., "https://api.openai.com")
    base_url: String,
    /// Bearer token; absent for unauthenticated local gateways
    api_key: Option<String>,
    /// Models served by this provider
    models: Vec<String>,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl OpenAiClient {
    pub fn new(
        name: String,
        base_url: String,
        api_key: Option<String>,
        models: Vec<String>,
        client: Arc<Client>,
    ) -> Self {
        Self {
            name,
            base_url,
            api_key,
            models,
            client,
        }
    }

    fn translate_request(request: &ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: true,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(
                    request
                        .tools
                        .iter()
                        .map(|t| OpenAiTool {
                            tool_type: "function".to_string(),
                            function: OpenAiFunction {
                                name: t.name.clone(),
                                description: t.description.clone(),
                                parameters: t.parameters.clone(),
                            },
                        })
                        .collect(),
                )
            },
        }
    }
}

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Streaming chunk, deserialized leniently: unknown fields ignored.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates one tool call's fragments until it is complete.
#[derive(Debug, Default)]
struct PendingToolCall {
    index: u32,
    name: String,
    arguments: String,
}

impl PendingToolCall {
    fn into_event(self) -> ProviderEvent {
        ProviderEvent::ToolCall {
            name: self.name,
            arguments: self.arguments,
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<BoxStream<'static, Result<ProviderEvent, ProviderError>>, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = Self::translate_request(&request);

        let mut req = self
            .client
            .post(&url)
            .json(&body)
            .timeout(REQUEST_TIMEOUT);

        if let Some(key) = &self.api_key {
            req = req.header("authorization", format!("Bearer {}", key));
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(REQUEST_TIMEOUT.as_millis() as u64)
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let provider = self.name.clone();
        let stream = try_stream! {
            let mut parser = SseParser::new();
            let mut byte_stream = response.bytes_stream();
            // At most one tool call is in flight per index; a fragment for a
            // new index means the previous call is complete.
            let mut pending: Option<PendingToolCall> = None;

            'read: while let Some(chunk) = byte_stream.next().await {
                let bytes = chunk.map_err(|e| ProviderError::Network(e.to_string()))?;

                for payload in parser.feed(&bytes) {
                    if payload == "[DONE]" {
                        break 'read;
                    }

                    let chunk: StreamChunk = match serde_json::from_str(&payload) {
                        Ok(c) => c,
                        Err(e) => {
                            // Tolerant skip: one bad frame never aborts the stream.
                            tracing::warn!(provider = %provider, error = %e, "Skipping malformed stream chunk");
                            continue;
                        }
                    };

                    for choice in chunk.choices {
                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                yield ProviderEvent::Content(content);
                            }
                        }

                        for fragment in choice.delta.tool_calls.unwrap_or_default() {
                            let starts_new = pending
                                .as_ref()
                                .is_some_and(|p| p.index != fragment.index);
                            if starts_new {
                                if let Some(done) = pending.take() {
                                    yield done.into_event();
                                }
                            }

                            let entry = pending.get_or_insert_with(|| PendingToolCall {
                                index: fragment.index,
                                ..Default::default()
                            });
                            if let Some(function) = fragment.function {
                                if let Some(name) = function.name {
                                    entry.name.push_str(&name);
                                }
                                if let Some(arguments) = function.arguments {
                                    entry.arguments.push_str(&arguments);
                                }
                            }
                        }

                        if choice.finish_reason.as_deref() == Some("tool_calls") {
                            if let Some(done) = pending.take() {
                                yield done.into_event();
                            }
                        }
                    }
                }
            }

            // Flush a trailing tool call if the stream ended before a
            // finish_reason arrived.
            if let Some(done) = pending.take() {
                yield done.into_event();
            }

            yield ProviderEvent::Done;
        };

        Ok(Box::pin(stream))
    }
}
