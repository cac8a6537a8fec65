//! Provider client construction and model lookup.

use super::anthropic::AnthropicClient;
use super::openai::OpenAiClient;
use super::{ProviderClient, ProviderError};
use crate::config::provider::{ProviderConfig, ProviderKind};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps model identifiers to the provider client that serves them.
///
/// Built once at startup from configuration; lookups are read-only for the
/// process lifetime, so a plain `HashMap` behind `Arc` suffices.
pub struct ProviderRegistry {
    clients: Vec<Arc<dyn ProviderClient>>,
    by_model: HashMap<String, usize>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            clients: Vec::new(),
            by_model: HashMap::new(),
        }
    }
}

impl ProviderRegistry {
    /// An empty registry; clients are added with [`register`](Self::register).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::MissingApiKey` if a provider names an API key
    /// environment variable that is unset or empty. Anthropic providers
    /// require a key; OpenAI-compatible providers may omit one for local
    /// gateways.
    pub fn from_config(
        configs: &[ProviderConfig],
        http_client: Arc<Client>,
    ) -> Result<Self, ProviderError> {
        let mut registry = Self::new();

        for config in configs {
            let api_key = resolve_api_key(config)?;

            let client: Arc<dyn ProviderClient> = match config.kind {
                ProviderKind::Anthropic => {
                    let key = api_key.ok_or_else(|| {
                        ProviderError::MissingApiKey(
                            config.api_key_env.clone().unwrap_or_default(),
                        )
                    })?;
                    Arc::new(AnthropicClient::new(
                        config.name.clone(),
                        config.base_url.clone(),
                        key,
                        config.models.clone(),
                        Arc::clone(&http_client),
                    ))
                }
                ProviderKind::OpenAi => Arc::new(OpenAiClient::new(
                    config.name.clone(),
                    config.base_url.clone(),
                    api_key,
                    config.models.clone(),
                    Arc::clone(&http_client),
                )),
            };

            registry.register(client);
        }

        Ok(registry)
    }

    /// Register a client, indexing every model it serves.
    ///
    /// Later registrations win on model-id collisions, matching config file
    /// order semantics (last entry overrides).
    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        let index = self.clients.len();
        for model in client.models() {
            self.by_model.insert(model.clone(), index);
        }
        self.clients.push(client);
    }

    /// Look up the client serving a model.
    pub fn client_for(&self, model: &str) -> Option<Arc<dyn ProviderClient>> {
        self.by_model
            .get(model)
            .map(|&index| Arc::clone(&self.clients[index]))
    }

    /// All registered clients, in registration order.
    pub fn clients(&self) -> &[Arc<dyn ProviderClient>] {
        &self.clients
    }

    /// All known model identifiers, sorted for stable output.
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.by_model.keys().cloned().collect();
        models.sort();
        models
    }

    /// Whether any provider serves this model.
    pub fn knows_model(&self, model: &str) -> bool {
        self.by_model.contains_key(model)
    }
}

/// Read the provider's API key from its configured environment variable.
fn resolve_api_key(config: &ProviderConfig) -> Result<Option<String>, ProviderError> {
    match &config.api_key_env {
        Some(var) => match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            _ => Err(ProviderError::MissingApiKey(var.clone())),
        },
        None => Ok(None),
    }
}
