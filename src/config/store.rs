//! Persistence configuration

use serde::{Deserialize, Serialize};

/// REST store settings. Disabled by default; the server then keeps records
/// in process memory only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    /// PostgREST-style base URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Environment variable holding the service key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}
