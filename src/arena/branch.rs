//! Per-branch state tracking for a fan-out dispatch.

use super::event::Latency;
use std::time::{Duration, Instant};

/// Lifecycle of one branch. Transitions are one-way:
/// Idle -> Streaming -> Complete | Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    Idle,
    Streaming,
    Complete,
    Error,
}

impl BranchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BranchStatus::Complete | BranchStatus::Error)
    }
}

/// One model's participation in a dispatch.
///
/// Created when dispatch starts, mutated by each decoded upstream chunk,
/// frozen at its terminal status. Single-writer: only the branch's own task
/// touches it, which is what preserves per-model chunk ordering.
#[derive(Debug, Clone)]
pub struct Branch {
    pub model: String,
    pub content: String,
    pub status: BranchStatus,
    ttft: Option<Duration>,
    total: Option<Duration>,
    pub error: Option<String>,
}

impl Branch {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content: String::new(),
            status: BranchStatus::Idle,
            ttft: None,
            total: None,
            error: None,
        }
    }

    /// Record a decoded chunk. The first chunk fixes time-to-first-token.
    pub fn record_chunk(&mut self, content: &str, started: Instant) {
        if self.ttft.is_none() {
            self.ttft = Some(started.elapsed());
        }
        self.status = BranchStatus::Streaming;
        self.content.push_str(content);
    }

    /// Freeze the branch as successfully completed.
    pub fn complete(&mut self, started: Instant) {
        self.total = Some(started.elapsed());
        self.status = BranchStatus::Complete;
    }

    /// Freeze the branch as failed.
    pub fn fail(&mut self, error: impl Into<String>, started: Instant) {
        self.total = Some(started.elapsed());
        self.status = BranchStatus::Error;
        self.error = Some(error.into());
    }

    /// Latency measurement for the terminal event.
    ///
    /// Valid once the branch is terminal; `total_ms` falls back to 0 if
    /// called earlier.
    pub fn latency(&self) -> Latency {
        Latency {
            ttft_ms: self.ttft.map(|d| d.as_millis() as u64),
            total_ms: self.total.map(|d| d.as_millis() as u64).unwrap_or(0),
        }
    }
}
