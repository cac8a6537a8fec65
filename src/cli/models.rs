//! Models command handlers

use crate::cli::output::{format_models_json, format_models_table, ModelView};
use crate::cli::ModelsArgs;
use crate::config::PitConfig;

/// Handle `promptpit models` command
pub fn handle_models(args: &ModelsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = if args.config.exists() {
        PitConfig::load(Some(&args.config))?
    } else {
        PitConfig::default()
    };

    let mut views: Vec<ModelView> = config
        .providers
        .iter()
        .filter(|p| {
            args.provider
                .as_deref()
                .map_or(true, |filter| p.name == filter)
        })
        .flat_map(|p| {
            p.models.iter().map(|m| ModelView {
                id: m.clone(),
                provider: p.name.clone(),
            })
        })
        .collect();
    views.sort_by(|a, b| a.id.cmp(&b.id));

    if args.json {
        println!("{}", format_models_json(&views));
    } else {
        if views.is_empty() {
            println!("No models available.");
            return Ok(());
        }
        println!("{}", format_models_table(&views));
    }

    Ok(())
}
