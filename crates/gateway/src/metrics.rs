use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking gateway request outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Requests accepted by the gateway.
    pub requests_accepted: AtomicU64,
    /// Requests that ended in an error response.
    pub requests_failed: AtomicU64,
    /// Response payload bytes handed back to clients.
    pub bytes_transferred: AtomicU64,
}

impl GatewayMetrics {
    /// Record an accepted request.
    pub fn record_accepted(&self) {
        self.requests_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request.
    pub fn record_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record response payload bytes sent to a client.
    pub fn record_bytes(&self, n: u64) {
        self.bytes_transferred.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_accepted: self.requests_accepted.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`GatewayMetrics`] at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests accepted by the gateway.
    pub requests_accepted: u64,
    /// Requests that ended in an error response.
    pub requests_failed: u64,
    /// Response payload bytes handed back to clients.
    pub bytes_transferred: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = GatewayMetrics::default();
        let snap = m.snapshot();
        assert_eq!(snap.requests_accepted, 0);
        assert_eq!(snap.requests_failed, 0);
        assert_eq!(snap.bytes_transferred, 0);
    }

    #[test]
    fn record_and_snapshot() {
        let m = GatewayMetrics::default();
        m.record_accepted();
        m.record_accepted();
        m.record_failed();
        m.record_bytes(128);

        let snap = m.snapshot();
        assert_eq!(snap.requests_accepted, 2);
        assert_eq!(snap.requests_failed, 1);
        assert_eq!(snap.bytes_transferred, 128);
    }
}
