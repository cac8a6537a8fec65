//! Arena pipeline configuration

use serde::{Deserialize, Serialize};

/// Fan-out, judge and quick-mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Hard cap on models per debate request.
    pub max_models: usize,
    /// Optional per-branch deadline. Unset means branches wait on the
    /// upstream indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_timeout_seconds: Option<u64>,
    /// Model driven through the scoring tool protocol.
    pub judge_model: String,
    /// Fallback model for quick mode when no preference exists.
    pub quick_default_model: String,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_models: 4,
            branch_timeout_seconds: None,
            judge_model: "claude-sonnet-4".to_string(),
            quick_default_model: "gpt-4o-mini".to_string(),
        }
    }
}
