//! Field extraction helpers for structured logging

use crate::arena::StreamEvent;

/// Truncate a prompt for logging preview (privacy-safe)
///
/// Returns None when content logging is disabled, otherwise the first ~100
/// characters. Enough context for debugging without logging conversations.
pub fn truncate_prompt(prompt: &str, enable_content_logging: bool) -> Option<String> {
    if !enable_content_logging || prompt.is_empty() {
        return None;
    }
    Some(truncate_string(prompt, 100))
}

/// Short tag for an event, for per-kind log counters.
pub fn event_kind(event: &StreamEvent) -> &'static str {
    match event {
        StreamEvent::Chunk { .. } => "chunk",
        StreamEvent::ModelComplete { .. } => "model_complete",
        StreamEvent::Error { .. } => "error",
        StreamEvent::AllComplete => "all_complete",
        StreamEvent::ToolCall { .. } => "tool_call",
        StreamEvent::Scoring { .. } => "scoring",
        StreamEvent::Verdict { .. } => "verdict",
        StreamEvent::Complete { .. } => "complete",
    }
}

/// Truncate a string to a maximum length, on a char boundary.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
