//! Shared request/event types for provider clients.

use serde::{Deserialize, Serialize};

/// A single message in a conversation, uniform across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A callable tool definition passed to a tool-calling model.
///
/// `parameters` is a JSON Schema object in the shape both the OpenAI and
/// Anthropic tool APIs accept.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Uniform streaming chat request.
///
/// Providers translate this into their own wire format; callers never build
/// provider-specific request bodies.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Tool definitions for the judge flow; empty for plain completions.
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    /// Plain streaming completion with no tools.
    pub fn completion(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            tools: Vec::new(),
        }
    }
}

/// Uniform decoded event yielded by a provider stream.
///
/// Providers decode their own streaming formats down to this union; the
/// arena layer never sees provider wire formats.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// A token-level text fragment, in generation order.
    Content(String),
    /// A completed tool invocation. `arguments` is the raw JSON argument
    /// string as produced by the model; callers parse it fallibly.
    ToolCall { name: String, arguments: String },
    /// The upstream stream finished normally.
    Done,
}
