//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{LogFormat, PitConfig};
use crate::provider::ProviderRegistry;
use crate::store::{DebateStore, MemoryStore, RestStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<PitConfig, Box<dyn std::error::Error>> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        PitConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        PitConfig::default()
    };

    // Apply environment variable overrides
    config = config.with_env_overrides();

    // Apply CLI overrides (highest priority)
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.no_rate_limits {
        config.limits.enabled = false;
    }
    if args.no_store {
        config.store.enabled = false;
    }

    Ok(config)
}

/// Initialize tracing based on configuration
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // Warn if content logging is enabled
    if config.enable_content_logging {
        eprintln!("WARNING: Content logging is enabled. Prompt content will be logged.");
        eprintln!("         This may include sensitive data. Use only for debugging.");
    }

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Build the store implementation from configuration.
///
/// A disabled store degrades to the in-memory sink, so handlers never need
/// to special-case persistence.
pub fn build_store(
    config: &PitConfig,
    http_client: Arc<reqwest::Client>,
) -> Result<Arc<dyn DebateStore>, Box<dyn std::error::Error>> {
    if !config.store.enabled {
        tracing::info!("Persistence store disabled, using in-memory sink");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let key_env = config
        .store
        .api_key_env
        .as_deref()
        .ok_or("store.api_key_env is required when the store is enabled")?;
    let api_key = std::env::var(key_env)
        .map_err(|_| format!("environment variable {} is not set", key_env))?;

    tracing::info!(base_url = %config.store.base_url, "Using REST persistence store");
    Ok(Arc::new(RestStore::new(
        config.store.base_url.clone(),
        api_key,
        http_client,
    )))
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and merge configuration
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting PromptPit server");
    tracing::debug!(?config, "Loaded configuration");

    // 3. Build the provider registry and store
    let http_client = Arc::new(reqwest::Client::new());
    let providers = Arc::new(ProviderRegistry::from_config(
        &config.providers,
        Arc::clone(&http_client),
    )?);
    tracing::info!(
        providers = providers.clients().len(),
        models = providers.models().len(),
        "Providers registered"
    );

    let store = build_store(&config, http_client)?;

    // 4. Build API router
    let config = Arc::new(config);
    let app_state = Arc::new(AppState::new(
        Arc::clone(&config),
        providers,
        store,
    ));
    let app = create_router(Arc::clone(&app_state));

    // 5. Start the rate-limit sweeper (if limiting is enabled)
    let cancel_token = CancellationToken::new();
    let sweeper_handle = if config.limits.enabled {
        Some(app_state.limiter.spawn_sweeper(
            Duration::from_secs(config.limits.sweep_interval_seconds),
            cancel_token.clone(),
        ))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // 6. Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "PromptPit API server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    // 7. Cleanup
    if let Some(handle) = sweeper_handle {
        tracing::info!("Waiting for rate-limit sweeper to stop");
        handle.await?;
    }

    tracing::info!("PromptPit server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn serve_args(config: PathBuf) -> ServeArgs {
        ServeArgs {
            config,
            port: None,
            host: None,
            log_level: None,
            no_rate_limits: false,
            no_store: false,
        }
    }

    #[tokio::test]
    async fn test_serve_config_loading() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8080").unwrap();

        let config = load_config_with_overrides(&serve_args(temp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[tokio::test]
    async fn test_serve_cli_overrides_config() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8080").unwrap();

        let mut args = serve_args(temp.path().to_path_buf());
        args.port = Some(9000);

        let config = load_config_with_overrides(&args).unwrap();
        assert_eq!(config.server.port, 9000); // CLI wins
    }

    #[tokio::test]
    async fn test_serve_works_without_config_file() {
        let config =
            load_config_with_overrides(&serve_args(PathBuf::from("nonexistent.toml"))).unwrap();
        assert_eq!(config.server.port, 8000); // Default
    }

    #[tokio::test]
    async fn test_no_rate_limits_flag() {
        let mut args = serve_args(PathBuf::from("nonexistent.toml"));
        args.no_rate_limits = true;

        let config = load_config_with_overrides(&args).unwrap();
        assert!(!config.limits.enabled);
    }

    #[tokio::test]
    async fn test_disabled_store_uses_memory() {
        let config = PitConfig::default();
        let store = build_store(&config, Arc::new(reqwest::Client::new())).unwrap();
        // Should accept writes without any backing service.
        let record = crate::store::DebateRecord::from_branches("p", &[]);
        store.insert_debate(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_enabled_store_requires_key_env() {
        let mut config = PitConfig::default();
        config.store.enabled = true;
        config.store.base_url = "http://localhost".to_string();
        config.store.api_key_env = Some("PROMPTPIT_TEST_MISSING_STORE_KEY".to_string());

        let result = build_store(&config, Arc::new(reqwest::Client::new()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_signal_triggers_cancel() {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel_clone.cancel();
        });

        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_secs(5)) => {
                panic!("Shutdown didn't trigger");
            }
        }

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let limiter = Arc::new(crate::limit::RateLimiter::new());
        let cancel = CancellationToken::new();
        let handle = limiter.spawn_sweeper(Duration::from_millis(10), cancel.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok());
    }
}
