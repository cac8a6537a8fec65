//! Fire-and-forget persistence.
//!
//! Every write happens after the client's stream already closed, so store
//! failures are logged and swallowed rather than surfaced to the browser.

pub mod memory;
pub mod record;
pub mod rest;

pub use memory::MemoryStore;
pub use record::{branch_succeeded, DebateRecord, ResponseRecord};
pub use rest::RestStore;

use crate::arena::{ScoreBoard, VerdictSummary};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Network(String),

    #[error("Store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

/// Result of one quick-mode run, fed back into preference learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
        }
    }
}

/// Persistence seam for debate records and per-user model preferences.
#[async_trait]
pub trait DebateStore: Send + Sync + 'static {
    /// Append one completed debate. Never called twice for the same record.
    async fn insert_debate(&self, record: &DebateRecord) -> Result<(), StoreError>;

    /// Attach the judge's output to an already-written debate row. A missing
    /// row is not an error.
    async fn attach_judgement(
        &self,
        debate_id: Uuid,
        scores: &ScoreBoard,
        verdict: Option<&VerdictSummary>,
    ) -> Result<(), StoreError>;

    /// The user's preferred model for a prompt category, if any outcome
    /// history exists.
    async fn preferred_model(
        &self,
        user: &str,
        category: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Increment the win or loss counter for (user, category, model).
    async fn record_outcome(
        &self,
        user: &str,
        category: &str,
        model: &str,
        outcome: Outcome,
    ) -> Result<(), StoreError>;
}
