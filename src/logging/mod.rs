//! Structured logging module for request tracing
//!
//! Provides filter-directive construction from config, request ID
//! generation and privacy-safe field helpers.

pub mod fields;
pub mod middleware;

pub use fields::{event_kind, truncate_prompt};
pub use middleware::generate_request_id;

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Examples
///
/// ```
/// use promptpit::config::logging::LoggingConfig;
/// use promptpit::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("arena".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: promptpit::config::logging::LogFormat::Pretty,
///     component_levels: Some(component_levels),
///     enable_content_logging: false,
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,promptpit::arena=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        for (component, level) in component_levels {
            filter_str.push_str(&format!(",promptpit::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn test_filter_without_components() {
        let config = LoggingConfig::default();
        assert_eq!(build_filter_directives(&config), "info");
    }

    #[test]
    fn test_filter_with_component_level() {
        let mut config = LoggingConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        let mut levels = std::collections::HashMap::new();
        levels.insert("limit".to_string(), "trace".to_string());
        config.component_levels = Some(levels);

        assert_eq!(
            build_filter_directives(&config),
            "warn,promptpit::limit=trace"
        );
    }
}
