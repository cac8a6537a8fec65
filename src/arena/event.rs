//! The stream event union - the wire contract between server and browser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latency measurements for one branch, in milliseconds.
///
/// `ttft_ms` is measured from dispatch start to the first chunk; `total_ms`
/// from dispatch start to the branch's terminal event. TTFT is absent when a
/// branch failed before producing any output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Latency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttft_ms: Option<u64>,
    pub total_ms: u64,
}

/// One category's score for one model, as produced by the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: f64,
    pub rationale: String,
}

/// Accumulated judge scores: model -> category -> score.
///
/// Categories are judge-determined and open-ended; consumers must not assume
/// a fixed category list. BTreeMap keeps serialized output stable.
pub type ScoreBoard = BTreeMap<String, BTreeMap<String, CategoryScore>>;

/// The judge's final decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub winner: String,
    pub verdict: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

/// Events relayed to the browser over SSE.
///
/// Ordering invariant: for a given model, `chunk` events are emitted in
/// generation order and always precede that model's `model_complete`;
/// `all_complete` is emitted only after every branch reached a terminal
/// event. The judge flow terminates with a single `complete` carrying the
/// full accumulated state for client-side reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A token fragment from one model's branch.
    Chunk { model: String, content: String },
    /// A branch finished successfully.
    ModelComplete { model: String, latency: Latency },
    /// A branch failed; siblings are unaffected.
    Error { model: String, error: String },
    /// Every branch reached a terminal event; the stream closes after this.
    AllComplete,
    /// The judge invoked a tool (relayed before the mapped event).
    ToolCall { tool: String },
    /// One per-category score from the judge.
    Scoring {
        model: String,
        category: String,
        score: f64,
        rationale: String,
    },
    /// The judge declared a winner.
    Verdict {
        winner: String,
        verdict: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        highlight: Option<String>,
    },
    /// Terminal judge event with the accumulated state.
    Complete {
        scores: ScoreBoard,
        #[serde(skip_serializing_if = "Option::is_none")]
        verdict: Option<VerdictSummary>,
    },
}
