//! Configuration module for PromptPit
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`PROMPTPIT_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use promptpit::config::PitConfig;
//!
//! // Load defaults
//! let config = PitConfig::default();
//! assert_eq!(config.server.port, 8000);
//!
//! // Parse from TOML
//! let toml = r#"
//! [server]
//! port = 9000
//! "#;
//! let config: PitConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```

pub mod arena;
pub mod error;
pub mod limits;
pub mod logging;
pub mod provider;
pub mod server;
pub mod store;

pub use arena::ArenaConfig;
pub use error::ConfigError;
pub use limits::{EndpointLimit, LimitsConfig};
pub use logging::{LogFormat, LoggingConfig};
pub use provider::{ProviderConfig, ProviderKind};
pub use server::ServerConfig;
pub use store::StoreConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the PromptPit server.
///
/// Aggregates server settings, upstream providers, arena behavior, rate
/// limits, persistence and logging.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PitConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Upstream provider definitions
    pub providers: Vec<ProviderConfig>,
    /// Fan-out, judge and quick-mode behavior
    pub arena: ArenaConfig,
    /// Per-endpoint rate limits
    pub limits: LimitsConfig,
    /// Persistence settings
    pub store: StoreConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl PitConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports PROMPTPIT_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("PROMPTPIT_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("PROMPTPIT_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("PROMPTPIT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PROMPTPIT_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(limits) = std::env::var("PROMPTPIT_RATE_LIMITS") {
            self.limits.enabled = limits.to_lowercase() == "true";
        }
        if let Ok(judge) = std::env::var("PROMPTPIT_JUDGE_MODEL") {
            self.arena.judge_model = judge;
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        for (i, provider) in self.providers.iter().enumerate() {
            if provider.name.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("providers[{}].name", i),
                    message: "name cannot be empty".to_string(),
                });
            }
            if provider.base_url.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("providers[{}].base_url", i),
                    message: "base_url cannot be empty".to_string(),
                });
            }
            if provider.models.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("providers[{}].models", i),
                    message: "at least one model is required".to_string(),
                });
            }
        }

        if self.arena.max_models == 0 {
            return Err(ConfigError::Validation {
                field: "arena.max_models".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.arena.judge_model.is_empty() {
            return Err(ConfigError::Validation {
                field: "arena.judge_model".to_string(),
                message: "judge model cannot be empty".to_string(),
            });
        }
        if self.arena.quick_default_model.is_empty() {
            return Err(ConfigError::Validation {
                field: "arena.quick_default_model".to_string(),
                message: "quick default model cannot be empty".to_string(),
            });
        }

        if self.limits.enabled {
            for (name, endpoint) in [
                ("debate", self.limits.debate),
                ("judge", self.limits.judge),
                ("quick", self.limits.quick),
            ] {
                if endpoint.limit == 0 || endpoint.window_seconds == 0 {
                    return Err(ConfigError::Validation {
                        field: format!("limits.{}", name),
                        message: "limit and window_seconds must be non-zero".to_string(),
                    });
                }
            }
        }

        if self.store.enabled {
            if self.store.base_url.is_empty() {
                return Err(ConfigError::Validation {
                    field: "store.base_url".to_string(),
                    message: "required when the store is enabled".to_string(),
                });
            }
            if self.store.api_key_env.is_none() {
                return Err(ConfigError::Validation {
                    field: "store.api_key_env".to_string(),
                    message: "required when the store is enabled".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_pit_config_defaults() {
        let config = PitConfig::default();
        assert_eq!(config.server.port, 8000);
        assert!(config.providers.is_empty());
        assert!(config.limits.enabled);
        assert!(!config.store.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml = r#"
        [server]
        port = 9000
        "#;

        let config: PitConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0"); // Default
    }

    #[test]
    fn test_config_parse_full_toml() {
        let toml = include_str!("../../promptpit.example.toml");
        let config: PitConfig = toml::from_str(toml).unwrap();
        assert!(config.server.port > 0);
        assert!(!config.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_providers_array() {
        let toml = r#"
        [[providers]]
        name = "anthropic"
        type = "anthropic"
        base_url = "https://api.anthropic.com"
        api_key_env = "ANTHROPIC_API_KEY"
        models = ["claude-sonnet-4"]

        [[providers]]
        name = "local"
        type = "openai"
        base_url = "http://localhost:11434"
        models = ["llama3"]
        "#;

        let config: PitConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8080").unwrap();

        let config = PitConfig::load(Some(temp.path())).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_missing_file_error() {
        let result = PitConfig::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_env_override_port() {
        std::env::set_var("PROMPTPIT_PORT", "9999");
        let config = PitConfig::default().with_env_overrides();
        std::env::remove_var("PROMPTPIT_PORT");

        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_config_env_invalid_value_ignored() {
        std::env::set_var("PROMPTPIT_PORT", "not-a-number");
        let config = PitConfig::default().with_env_overrides();
        std::env::remove_var("PROMPTPIT_PORT");

        // Should keep default, not crash
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_config_env_override_judge_model() {
        std::env::set_var("PROMPTPIT_JUDGE_MODEL", "gpt-5");
        let config = PitConfig::default().with_env_overrides();
        std::env::remove_var("PROMPTPIT_JUDGE_MODEL");

        assert_eq!(config.arena.judge_model, "gpt-5");
    }

    #[test]
    fn test_config_env_override_rate_limits() {
        std::env::set_var("PROMPTPIT_RATE_LIMITS", "false");
        let config = PitConfig::default().with_env_overrides();
        std::env::remove_var("PROMPTPIT_RATE_LIMITS");

        assert!(!config.limits.enabled);
    }

    #[test]
    fn test_config_validation_zero_port() {
        let mut config = PitConfig::default();
        config.server.port = 0;

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field == "server.port"
        ));
    }

    #[test]
    fn test_config_validation_empty_provider_models() {
        let mut config = PitConfig::default();
        config.providers.push(ProviderConfig {
            name: "empty".to_string(),
            kind: ProviderKind::OpenAi,
            base_url: "http://localhost:1234".to_string(),
            api_key_env: None,
            models: vec![],
        });

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field.contains("models")
        ));
    }

    #[test]
    fn test_config_validation_store_requires_url() {
        let mut config = PitConfig::default();
        config.store.enabled = true;
        config.store.api_key_env = Some("KEY".to_string());

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field == "store.base_url"
        ));
    }

    #[test]
    fn test_config_validation_zero_limit() {
        let mut config = PitConfig::default();
        config.limits.debate.limit = 0;

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field == "limits.debate"
        ));
    }

    #[test]
    fn test_config_load_none_returns_defaults() {
        let config = PitConfig::load(None).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.arena.max_models, 4);
    }
}
