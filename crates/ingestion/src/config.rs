//! Intake configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Intake channel configuration
///
/// When the pipeline falls behind, the newest code is dropped; queued codes are
/// already stamped and older bursts carry the same reading anyway.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Channel capacity
    pub channel_capacity: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
        }
    }
}

/// Intake metrics
#[derive(Debug, Default)]
pub struct IntakeMetrics {
    /// Total codes received from sources
    pub codes_received: AtomicU64,

    /// Total codes dropped on a full channel
    pub codes_dropped: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IntakeMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record code received
    pub fn record_received(&self) {
        self.codes_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record code dropped
    pub fn record_dropped(&self) {
        self.codes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            codes_received: self.codes_received.load(Ordering::Relaxed),
            codes_dropped: self.codes_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub codes_received: u64,
    pub codes_dropped: u64,
    pub queue_len: usize,
}
