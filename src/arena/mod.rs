//! The arena pipeline: fan-out dispatch, judge relay and quick-mode routing.
//!
//! A request flows validation -> rate limit -> dispatch -> SSE relay, with
//! persistence happening after the stream closes. The three entry points
//! share the same event union ([`StreamEvent`]) and the same single-writer
//! branch discipline.

pub mod branch;
pub mod dispatch;
pub mod event;
pub mod judge;
pub mod quick;

pub use branch::{Branch, BranchStatus};
pub use dispatch::{DispatchHandle, DispatchSpec, Dispatcher, PreviousRound, RoundResponse};
pub use event::{CategoryScore, Latency, ScoreBoard, StreamEvent, VerdictSummary};
pub use judge::{JudgeHandle, JudgeRelay, JudgeSpec};
pub use quick::{classify, Category, QuickRoute, QuickRouter};
