//! CLI module for PromptPit
//!
//! Command-line interface definitions and handlers for the PromptPit arena
//! server.
//!
//! # Commands
//!
//! - `serve` - Start the PromptPit server
//! - `providers` - List configured providers and their models
//! - `models` - List model identifiers across all providers
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! promptpit serve
//!
//! # List providers from a config file
//! promptpit providers list -c promptpit.toml
//!
//! # Generate shell completions
//! promptpit completions bash > ~/.bash_completion.d/promptpit
//! ```

pub mod completions;
pub mod config;
pub mod models;
pub mod output;
pub mod providers;
pub mod serve;

pub use completions::handle_completions;
pub use config::handle_config_init;
pub use models::handle_models;
pub use providers::handle_providers_list;
pub use serve::run_serve;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// PromptPit - Multi-model prompt arena
#[derive(Parser, Debug)]
#[command(
    name = "promptpit",
    version,
    about = "Concurrent LLM fan-out, SSE relay and incremental judging"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the PromptPit server
    Serve(ServeArgs),
    /// Inspect configured providers
    #[command(subcommand)]
    Providers(ProvidersCommands),
    /// List available models
    Models(ModelsArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "promptpit.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "PROMPTPIT_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "PROMPTPIT_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PROMPTPIT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Disable rate limiting
    #[arg(long)]
    pub no_rate_limits: bool,

    /// Disable the persistence store
    #[arg(long)]
    pub no_store: bool,
}

#[derive(Subcommand, Debug)]
pub enum ProvidersCommands {
    /// List configured providers
    List(ProvidersListArgs),
}

#[derive(Args, Debug)]
pub struct ProvidersListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "promptpit.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Filter by provider name
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Path to configuration file
    #[arg(short = 'c', long, default_value = "promptpit.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "promptpit.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
