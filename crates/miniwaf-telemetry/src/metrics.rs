//! Metrics collection and reporting

use miniwaf_core::{Action, Event, EventSink};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Request and rule-match counters.
///
/// Values are kept locally for the stats endpoint and mirrored to the
/// `metrics` facade for Prometheus export.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    total_requests: AtomicU64,
    blocked_requests: AtomicU64,
    log_matches: AtomicU64,
    block_matches: AtomicU64,
    total_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                total_requests: AtomicU64::new(0),
                blocked_requests: AtomicU64::new(0),
                log_matches: AtomicU64::new(0),
                block_matches: AtomicU64::new(0),
                total_latency_us: AtomicU64::new(0),
            }),
        }
    }

    /// Record one finished inspection
    pub fn record_inspection(&self, blocked: bool, latency_us: u64) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);

        let decision = if blocked {
            self.inner.blocked_requests.fetch_add(1, Ordering::Relaxed);
            "block"
        } else {
            "allow"
        };

        ::metrics::counter!("miniwaf_requests_total").increment(1);
        ::metrics::counter!("miniwaf_decisions_total", "decision" => decision).increment(1);
        ::metrics::histogram!("miniwaf_inspection_latency_us").record(latency_us as f64);
    }

    /// Record a rule match
    pub fn record_match(&self, rule_id: &str, action: Action) {
        match action {
            Action::Block => self.inner.block_matches.fetch_add(1, Ordering::Relaxed),
            Action::Log => self.inner.log_matches.fetch_add(1, Ordering::Relaxed),
        };

        ::metrics::counter!(
            "miniwaf_rule_matches_total",
            "rule" => rule_id.to_string(),
            "action" => action.as_str()
        )
        .increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.inner.total_requests.load(Ordering::Relaxed),
            blocked_requests: self.inner.blocked_requests.load(Ordering::Relaxed),
            log_matches: self.inner.log_matches.load(Ordering::Relaxed),
            block_matches: self.inner.block_matches.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for MetricsCollector {
    fn emit(&self, event: &Event) {
        self.record_match(&event.rule_id, event.action);
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub log_matches: u64,
    pub block_matches: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Calculate average latency per request
    pub fn avg_latency_us(&self) -> u64 {
        if self.total_requests == 0 {
            0
        } else {
            self.total_latency_us / self.total_requests
        }
    }

    /// Fraction of requests that were blocked
    pub fn block_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.blocked_requests as f64 / self.total_requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let metrics = MetricsCollector::new();

        metrics.record_inspection(false, 100);
        metrics.record_inspection(true, 300);
        metrics.record_match("xss-1", Action::Log);
        metrics.record_match("sqli-1", Action::Block);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.blocked_requests, 1);
        assert_eq!(snapshot.log_matches, 1);
        assert_eq!(snapshot.block_matches, 1);
        assert_eq!(snapshot.avg_latency_us(), 200);
        assert_eq!(snapshot.block_rate(), 0.5);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.avg_latency_us(), 0);
        assert_eq!(snapshot.block_rate(), 0.0);
    }
}
