//! Provider client abstraction.
//!
//! This module provides the `ProviderClient` trait and supporting types that
//! abstract provider-specific streaming protocols behind a uniform token
//! event stream.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub mod anthropic;
pub mod error;
pub mod factory;
pub mod openai;
pub mod types;

pub use error::ProviderError;
pub use factory::ProviderRegistry;
pub use types::{ChatMessage, ChatRequest, ProviderEvent, ToolSpec};

/// Unified interface for streaming completion providers.
///
/// Encapsulates provider-specific HTTP protocols and stream decoding so the
/// arena pipeline can fan out across heterogeneous providers without type
/// branching.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as
/// `Arc<dyn ProviderClient>`.
///
/// # Cancellation Safety
///
/// Dropping a returned stream aborts the in-flight HTTP request; a shared
/// cancellation signal in the dispatcher relies on this.
#[async_trait]
pub trait ProviderClient: Send + Sync + 'static {
    /// Configured provider name (e.g. "anthropic-prod").
    fn name(&self) -> &str;

    /// Model identifiers this client serves.
    fn models(&self) -> &[String];

    /// Open a streaming chat request and decode it into uniform events.
    ///
    /// The returned stream yields `ProviderEvent::Content` per decoded token
    /// fragment, `ProviderEvent::ToolCall` per completed tool invocation
    /// (tool-calling requests only), and `ProviderEvent::Done` when the
    /// upstream stream finishes normally.
    ///
    /// # Errors
    ///
    /// Connection and authentication failures are returned before streaming
    /// starts; decode failures mid-stream are yielded as stream items.
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<BoxStream<'static, Result<ProviderEvent, ProviderError>>, ProviderError>;
}
