//! Upstream provider configuration

use serde::{Deserialize, Serialize};

/// Wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages streaming API.
    Anthropic,
    /// OpenAI chat-completions streaming API, including compatible local
    /// gateways.
    #[serde(rename = "openai")]
    OpenAi,
}

/// One upstream provider entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub base_url: String,
    /// Environment variable holding the API key. Optional for
    /// OpenAI-compatible local gateways.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Model identifiers this provider serves.
    pub models: Vec<String>,
}
