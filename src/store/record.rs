//! The persisted debate row.

use crate::arena::{Branch, BranchStatus, ScoreBoard, VerdictSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One model's final output inside a debate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub model: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttft_ms: Option<u64>,
    pub total_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only record of one completed debate.
///
/// Written once after the pipeline finishes; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRecord {
    pub id: Uuid,
    pub prompt: String,
    pub responses: Vec<ResponseRecord>,
    #[serde(skip_serializing_if = "ScoreBoard::is_empty")]
    pub scores: ScoreBoard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictSummary>,
    pub created_at: DateTime<Utc>,
}

impl DebateRecord {
    /// Freeze the finished branches into a record.
    pub fn from_branches(prompt: impl Into<String>, branches: &[Branch]) -> Self {
        let responses = branches
            .iter()
            .map(|branch| {
                let latency = branch.latency();
                ResponseRecord {
                    model: branch.model.clone(),
                    content: branch.content.clone(),
                    ttft_ms: latency.ttft_ms,
                    total_ms: latency.total_ms,
                    error: branch.error.clone(),
                }
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            responses,
            scores: ScoreBoard::new(),
            verdict: None,
            created_at: Utc::now(),
        }
    }

    /// Attach judge output produced after the fan-out.
    pub fn with_judgement(mut self, scores: ScoreBoard, verdict: Option<VerdictSummary>) -> Self {
        self.scores = scores;
        self.verdict = verdict;
        self
    }

    /// Whether any branch produced usable output. Records with nothing to
    /// show are not worth persisting.
    pub fn has_output(&self) -> bool {
        self.responses.iter().any(|r| !r.content.is_empty())
    }

    /// Convenience for tests and memory-store assertions.
    pub fn completed_models(&self) -> Vec<&str> {
        self.responses
            .iter()
            .filter(|r| r.error.is_none())
            .map(|r| r.model.as_str())
            .collect()
    }
}

/// Whether a branch should count as a completed response.
pub fn branch_succeeded(branch: &Branch) -> bool {
    branch.status == BranchStatus::Complete
}
