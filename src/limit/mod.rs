//! Fixed-window in-memory rate limiting.
//!
//! Windows reset wholesale at their deadline, so bursts straddling a reset
//! can briefly see up to twice the limit. That imprecision is accepted in
//! exchange for a single atomic map operation per check.

use axum::http::HeaderMap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Limit and window for one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    /// Requests left in the current window; 0 once denied.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
    /// Seconds to wait before retrying; only set on denial.
    pub retry_after: Option<u64>,
}

struct WindowEntry {
    count: u32,
    expires_at: Instant,
}

/// Process-local fixed-window counter table keyed by caller identifier.
///
/// Expired entries self-correct on next access; the background sweeper only
/// bounds memory for identifiers that never come back.
#[derive(Default)]
pub struct RateLimiter {
    entries: DashMap<String, WindowEntry>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against the identifier's current window.
    pub fn check(&self, identifier: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(identifier.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                expires_at: now + policy.window,
            });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + policy.window;
        }
        entry.count += 1;

        let allowed = entry.count <= policy.limit;
        let reset_after = entry.expires_at.saturating_duration_since(now);
        RateLimitDecision {
            allowed,
            limit: policy.limit,
            remaining: policy.limit.saturating_sub(entry.count),
            reset_after,
            retry_after: (!allowed).then(|| reset_after.as_secs().max(1)),
        }
    }

    /// Drop expired windows. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Number of tracked identifiers.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    /// Run the advisory sweep loop until cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            debug!(removed, tracked = limiter.tracked(),
                                "Swept expired rate-limit windows");
                        }
                    }
                }
            }
        })
    }
}

/// Best-effort client IP from proxy headers, first match wins.
pub fn client_ip(headers: &HeaderMap) -> String {
    for header in ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            // x-forwarded-for may carry a proxy chain; the client is first.
            if let Some(ip) = value.split(',').next().map(str::trim) {
                if !ip.is_empty() {
                    return ip.to_string();
                }
            }
        }
    }
    "unknown".to_string()
}

/// Rate-limit identifier: endpoint tag scoping the client IP.
pub fn identifier(headers: &HeaderMap, endpoint: &str) -> String {
    format!("{}:{}", endpoint, client_ip(headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy(limit: u32, window_ms: u64) -> RateLimitPolicy {
        RateLimitPolicy {
            limit,
            window: Duration::from_millis(window_ms),
        }
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new();
        let p = policy(3, 60_000);

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("1.2.3.4:debate", p);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert!(decision.retry_after.is_none());
        }

        let denied = limiter.check("1.2.3.4:debate", p);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after.is_some());
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = RateLimiter::new();
        let p = policy(1, 60_000);

        assert!(limiter.check("1.2.3.4:debate", p).allowed);
        assert!(!limiter.check("1.2.3.4:debate", p).allowed);
        assert!(limiter.check("5.6.7.8:debate", p).allowed);
        assert!(limiter.check("1.2.3.4:judge", p).allowed);
    }

    #[test]
    fn test_window_resets_wholesale() {
        let limiter = RateLimiter::new();
        let p = policy(1, 20);

        assert!(limiter.check("ip:ep", p).allowed);
        assert!(!limiter.check("ip:ep", p).allowed);

        std::thread::sleep(Duration::from_millis(30));
        let decision = limiter.check("ip:ep", p);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let limiter = RateLimiter::new();
        limiter.check("short", policy(1, 10));
        limiter.check("long", policy(1, 60_000));
        assert_eq!(limiter.tracked(), 2);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_denied_retry_after_at_least_one_second() {
        let limiter = RateLimiter::new();
        let p = policy(1, 500);
        limiter.check("ip", p);
        let denied = limiter.check("ip", p);
        assert_eq!(denied.retry_after, Some(1));
    }

    #[test]
    fn test_client_ip_header_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "1.2.3.4");

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(&headers), "9.9.9.9");

        headers.remove("x-real-ip");
        headers.insert("cf-connecting-ip", HeaderValue::from_static("8.8.8.8"));
        assert_eq!(client_ip(&headers), "8.8.8.8");

        headers.clear();
        assert_eq!(client_ip(&headers), "unknown");
    }

    #[test]
    fn test_identifier_scopes_by_endpoint() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        assert_eq!(identifier(&headers, "debate"), "debate:1.2.3.4");
    }
}
