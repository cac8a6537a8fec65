//! Output formatting helpers for CLI commands

use crate::config::{ProviderConfig, ProviderKind};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// View model for provider display
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderView {
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub models: Vec<String>,
    pub api_key_env: Option<String>,
}

impl From<&ProviderConfig> for ProviderView {
    fn from(provider: &ProviderConfig) -> Self {
        Self {
            name: provider.name.clone(),
            kind: match provider.kind {
                ProviderKind::Anthropic => "anthropic".to_string(),
                ProviderKind::OpenAi => "openai".to_string(),
            },
            base_url: provider.base_url.clone(),
            models: provider.models.clone(),
            api_key_env: provider.api_key_env.clone(),
        }
    }
}

/// View model for model display
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelView {
    pub id: String,
    pub provider: String,
}

/// Format providers as a table
pub fn format_providers_table(providers: &[ProviderView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Type", "Base URL", "Models", "API Key"]);

    for p in providers {
        let key_str = match &p.api_key_env {
            Some(env) if std::env::var(env).map_or(false, |v| !v.is_empty()) => {
                format!("{} ({})", "set".green(), env)
            }
            Some(env) => format!("{} ({})", "missing".red(), env),
            None => "none".yellow().to_string(),
        };

        table.add_row(vec![
            Cell::new(&p.name),
            Cell::new(&p.kind),
            Cell::new(&p.base_url),
            Cell::new(p.models.len()),
            Cell::new(key_str),
        ]);
    }

    table.to_string()
}

/// Format providers as JSON
pub fn format_providers_json(providers: &[ProviderView]) -> String {
    serde_json::to_string_pretty(&json!({
        "providers": providers
    }))
    .unwrap()
}

/// Format models as a table
pub fn format_models_table(models: &[ModelView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Model", "Provider"]);

    for m in models {
        table.add_row(vec![Cell::new(&m.id), Cell::new(&m.provider)]);
    }

    table.to_string()
}

/// Format models as JSON
pub fn format_models_json(models: &[ModelView]) -> String {
    serde_json::to_string_pretty(&json!({
        "models": models
    }))
    .unwrap()
}
