//! Provider error types.

use thiserror::Error;

/// Errors surfaced by provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure (DNS, connect, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the deadline (milliseconds).
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Provider returned an HTTP error status.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Provider response did not match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The configured API key environment variable is unset or empty.
    #[error("API key environment variable '{0}' is not set")]
    MissingApiKey(String),

    /// No configured provider serves the requested model.
    #[error("No provider configured for model '{0}'")]
    UnknownModel(String),
}
