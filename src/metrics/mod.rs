//! # Metrics Collection Module
//!
//! Provides request metrics tracking and Prometheus export via `GET /metrics`.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `promptpit_requests_total{endpoint}` - API requests
//! - `promptpit_rate_limited_total{endpoint}` - Denied requests
//! - `promptpit_branch_errors_total{model}` - Failed branches
//! - `promptpit_judge_errors_total` - Failed judge passes
//! - `promptpit_quick_requests_total{category}` - Quick-mode runs
//!
//! **Histograms:**
//! - `promptpit_branch_ttft_seconds{model}` - Time to first token
//! - `promptpit_branch_duration_seconds{model}` - Branch duration
//!
//! **Gauges:**
//! - `promptpit_providers_total` - Configured providers
//! - `promptpit_models_available` - Distinct model identifiers

pub use metrics_exporter_prometheus::PrometheusBuilder;

use crate::provider::ProviderRegistry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

/// Sanitize a Prometheus label value.
///
/// Label values must match `[a-zA-Z_][a-zA-Z0-9_]*`; model identifiers like
/// `gpt-4o` or `claude-sonnet-4:latest` do not. Invalid characters become
/// underscores and a leading digit gets an underscore prefix.
pub fn sanitize_label(label: &str) -> String {
    let mut sanitized: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }

    sanitized
}

/// Central coordinator for metrics collection and gauge computation.
pub struct MetricsCollector {
    /// Provider registry for computing gauges
    providers: Arc<ProviderRegistry>,
    /// Server startup time for uptime calculation
    start_time: Instant,
    /// Thread-safe cache for sanitized Prometheus labels
    label_cache: DashMap<String, String>,
    /// Prometheus handle for rendering metrics
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        start_time: Instant,
        prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        Self {
            providers,
            start_time,
            label_cache: DashMap::new(),
            prometheus_handle,
        }
    }

    /// Sanitized Prometheus label, cached for hot paths.
    pub fn sanitize_label(&self, label: &str) -> String {
        if let Some(cached) = self.label_cache.get(label) {
            return cached.clone();
        }
        let sanitized = sanitize_label(label);
        self.label_cache
            .insert(label.to_string(), sanitized.clone());
        sanitized
    }

    /// Update provider gauges. Called once at startup since the registry is
    /// immutable for the process lifetime.
    pub fn update_provider_gauges(&self) {
        metrics::gauge!("promptpit_providers_total")
            .set(self.providers.clients().len() as f64);
        metrics::gauge!("promptpit_models_available")
            .set(self.providers.models().len() as f64);
    }

    /// Uptime in seconds since server startup.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render Prometheus metrics in text format.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Initialize the Prometheus exporter with custom histogram buckets.
///
/// Buckets are sized for LLM streaming latencies: TTFT lands in the
/// sub-second buckets, full branches in the tens of seconds.
pub fn setup_metrics(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let duration_buckets = &[
        0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("promptpit_branch_ttft_seconds".to_string()),
            duration_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("promptpit_branch_duration_seconds".to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}
