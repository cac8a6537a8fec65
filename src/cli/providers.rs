//! Providers command handlers

use crate::cli::output::{format_providers_json, format_providers_table, ProviderView};
use crate::cli::ProvidersListArgs;
use crate::config::PitConfig;

/// Handle `promptpit providers list` command
pub fn handle_providers_list(args: &ProvidersListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = if args.config.exists() {
        PitConfig::load(Some(&args.config))?
    } else {
        PitConfig::default()
    };

    let views: Vec<ProviderView> = config.providers.iter().map(ProviderView::from).collect();

    if args.json {
        println!("{}", format_providers_json(&views));
    } else {
        if views.is_empty() {
            println!("No providers configured.");
            return Ok(());
        }
        println!("{}", format_providers_table(&views));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_providers_list_missing_config_uses_defaults() {
        let args = ProvidersListArgs {
            json: true,
            config: PathBuf::from("nonexistent.toml"),
        };
        handle_providers_list(&args).unwrap();
    }

    #[test]
    fn test_providers_list_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("promptpit.toml");
        std::fs::write(
            &path,
            r#"
[[providers]]
name = "local"
type = "openai"
base_url = "http://localhost:11434"
models = ["llama3"]
"#,
        )
        .unwrap();

        let args = ProvidersListArgs {
            json: true,
            config: path,
        };
        handle_providers_list(&args).unwrap();
    }
}
