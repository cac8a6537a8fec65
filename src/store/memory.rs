//! In-process store used when persistence is disabled, and by tests.

use super::record::DebateRecord;
use super::{DebateStore, Outcome, StoreError};
use crate::arena::{ScoreBoard, VerdictSummary};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    wins: u64,
    losses: u64,
}

/// Keeps everything in process memory. Contents vanish on restart, which is
/// exactly the behavior wanted for `store.enabled = false`.
#[derive(Default)]
pub struct MemoryStore {
    debates: Mutex<Vec<DebateRecord>>,
    /// (user, category, model) -> win/loss tally.
    outcomes: DashMap<(String, String, String), Tally>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted debates. Test hook.
    pub fn debate_count(&self) -> usize {
        self.debates.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Snapshot of persisted debates. Test hook.
    pub fn debates(&self) -> Vec<DebateRecord> {
        self.debates.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DebateStore for MemoryStore {
    async fn insert_debate(&self, record: &DebateRecord) -> Result<(), StoreError> {
        if let Ok(mut debates) = self.debates.lock() {
            debates.push(record.clone());
        }
        Ok(())
    }

    async fn attach_judgement(
        &self,
        debate_id: Uuid,
        scores: &ScoreBoard,
        verdict: Option<&VerdictSummary>,
    ) -> Result<(), StoreError> {
        if let Ok(mut debates) = self.debates.lock() {
            if let Some(record) = debates.iter_mut().find(|r| r.id == debate_id) {
                *record = record
                    .clone()
                    .with_judgement(scores.clone(), verdict.cloned());
            }
        }
        Ok(())
    }

    async fn preferred_model(
        &self,
        user: &str,
        category: &str,
    ) -> Result<Option<String>, StoreError> {
        let best = self
            .outcomes
            .iter()
            .filter(|entry| {
                let (u, c, _) = entry.key();
                u == user && c == category && entry.value().wins > 0
            })
            .max_by_key(|entry| entry.value().wins)
            .map(|entry| entry.key().2.clone());
        Ok(best)
    }

    async fn record_outcome(
        &self,
        user: &str,
        category: &str,
        model: &str,
        outcome: Outcome,
    ) -> Result<(), StoreError> {
        let key = (user.to_string(), category.to_string(), model.to_string());
        let mut tally = self.outcomes.entry(key).or_default();
        match outcome {
            Outcome::Win => tally.wins += 1,
            Outcome::Loss => tally.losses += 1,
        }
        Ok(())
    }
}
