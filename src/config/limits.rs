//! Rate-limit configuration

use crate::limit::RateLimitPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed-window limit for one endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointLimit {
    pub limit: u32,
    pub window_seconds: u64,
}

impl EndpointLimit {
    const fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }

    pub fn policy(self) -> RateLimitPolicy {
        RateLimitPolicy {
            limit: self.limit,
            window: Duration::from_secs(self.window_seconds),
        }
    }
}

impl Default for EndpointLimit {
    fn default() -> Self {
        Self::new(30, 60)
    }
}

/// Rate-limit settings, per endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub enabled: bool,
    /// Fan-out debates are the expensive endpoint.
    pub debate: EndpointLimit,
    pub judge: EndpointLimit,
    pub quick: EndpointLimit,
    /// Cadence of the advisory expired-window sweep.
    pub sweep_interval_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debate: EndpointLimit::new(10, 60),
            judge: EndpointLimit::new(20, 60),
            quick: EndpointLimit::new(30, 60),
            sweep_interval_seconds: 60,
        }
    }
}
