//! Anthropic Claude provider client.
//!
//! Translates between the uniform chat request shape and the Anthropic
//! Messages API, and decodes its event-typed streaming format into uniform
//! provider events.

use super::{ChatMessage, ChatRequest, ProviderClient, ProviderError, ProviderEvent};
use crate::sse::SseParser;
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API requires max_tokens; used when the caller sets none.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic provider client.
///
/// - Chat completion via POST /v1/messages with x-api-key header
/// - Text deltas decoded from `content_block_delta` / `text_delta` events
/// - Tool invocations assembled from `tool_use` blocks and their
///   `input_json_delta` fragments
pub struct AnthropicClient {
    /// Configured provider name
    name: String,
    /// Base URL (e.g., "https://api.anthropic.com")
    base_url: String,
    /// API key for x-api-key authentication
    api_key: String,
    /// Models served by this provider
    models: Vec<String>,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl AnthropicClient {
    pub fn new(
        name: String,
        base_url: String,
        api_key: String,
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

    /// Extract the system message; Anthropic carries it outside the
    /// messages array.
    fn extract_system_message(messages: &[ChatMessage]) -> Option<String> {
        messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone())
    }

    fn translate_request(request: &ChatRequest) -> AnthropicRequest {
        let system = Self::extract_system_message(&request.messages);
        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| AnthropicMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: request.model.clone(),
            messages,
            system,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            stream: true,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(
                    request
                        .tools
                        .iter()
                        .map(|t| AnthropicTool {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            input_schema: t.parameters.clone(),
                        })
                        .collect(),
                )
            },
        }
    }
}

/// Anthropic request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

/// Streaming event, discriminated by `type`. Unknown event types (pings,
/// message_delta bookkeeping) deserialize into `Other` and are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    ContentBlockStart {
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        delta: BlockDelta,
    },
    ContentBlockStop {},
    MessageStop {},
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {},
    ToolUse { name: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[async_trait]
impl ProviderClient for AnthropicClient {
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
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::translate_request(&request);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
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
            // (tool name, accumulated input JSON) for the open tool_use block.
            let mut pending_tool: Option<(String, String)> = None;

            'read: while let Some(chunk) = byte_stream.next().await {
                let bytes = chunk.map_err(|e| ProviderError::Network(e.to_string()))?;

                for payload in parser.feed(&bytes) {
                    let event: AnthropicStreamEvent = match serde_json::from_str(&payload) {
                        Ok(e) => e,
                        Err(e) => {
                            tracing::warn!(provider = %provider, error = %e, "Skipping malformed stream event");
                            continue;
                        }
                    };

                    match event {
                        AnthropicStreamEvent::ContentBlockStart { content_block } => {
                            if let ContentBlock::ToolUse { name } = content_block {
                                pending_tool = Some((name, String::new()));
                            }
                        }
                        AnthropicStreamEvent::ContentBlockDelta { delta } => match delta {
                            BlockDelta::TextDelta { text } => {
                                if !text.is_empty() {
                                    yield ProviderEvent::Content(text);
                                }
                            }
                            BlockDelta::InputJsonDelta { partial_json } => {
                                if let Some((_, arguments)) = pending_tool.as_mut() {
                                    arguments.push_str(&partial_json);
                                }
                            }
                            BlockDelta::Other => {}
                        },
                        AnthropicStreamEvent::ContentBlockStop {} => {
                            if let Some((name, arguments)) = pending_tool.take() {
                                yield ProviderEvent::ToolCall { name, arguments };
                            }
                        }
                        AnthropicStreamEvent::MessageStop {} => {
                            break 'read;
                        }
                        AnthropicStreamEvent::Other => {}
                    }
                }
            }

            yield ProviderEvent::Done;
        };

        Ok(Box::pin(stream))
    }
}
