//! Relay metric recording
//!
//! Counters and histograms go through the `metrics` facade; the aggregator
//! keeps an in-memory copy for the end-of-run summary.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{DeliveryOutcome, ReadingKind};
use metrics::{counter, gauge, histogram};

/// Record a raw code taken from the intake
pub fn record_code_received() {
    counter!("rf_relay_codes_received_total").increment(1);
}

/// Record the unknown-encoding sentinel
pub fn record_code_unrecognized() {
    counter!("rf_relay_codes_unrecognized_total").increment(1);
}

/// Record a retransmission suppressed by the dedup window
pub fn record_duplicate() {
    counter!("rf_relay_duplicates_total").increment(1);
}

/// Record one sink delivery attempt
pub fn record_delivery(outcome: &DeliveryOutcome, elapsed: Duration) {
    let status = if outcome.success { "success" } else { "failure" };
    counter!(
        "rf_relay_deliveries_total",
        "sink" => outcome.sink.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "rf_relay_delivery_latency_ms",
        "sink" => outcome.sink.clone()
    )
    .record(elapsed.as_secs_f64() * 1000.0);
}

/// Record a persisted row
pub fn record_persisted(kind: ReadingKind, posted: bool) {
    counter!(
        "rf_relay_records_total",
        "table" => kind.table(),
        "posted" => if posted { "1" } else { "0" }
    )
    .increment(1);
}

/// Record a store failure
pub fn record_store_failure() {
    counter!("rf_relay_store_failures_total").increment(1);
}

/// Record intake queue depth
pub fn record_intake_depth(depth: usize) {
    gauge!("rf_relay_intake_depth").set(depth as f64);
}

/// Per-sink delivery tallies
#[derive(Debug, Clone, Default)]
pub struct SinkTally {
    pub successes: u64,
    pub failures: u64,
    pub latency_ms: RunningStats,
}

/// Delivery metrics aggregator
///
/// Aggregates outcomes in memory for the run summary.
#[derive(Debug, Clone, Default)]
pub struct DeliveryMetricsAggregator {
    /// Dispatched observations
    pub total_dispatches: u64,

    /// Dispatches whose primary sink succeeded
    pub total_posted: u64,

    /// Per-sink tallies, ordered by sink name
    pub sinks: BTreeMap<String, SinkTally>,
}

impl DeliveryMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one sink outcome
    pub fn update(&mut self, outcome: &DeliveryOutcome, elapsed: Duration) {
        let tally = self.sinks.entry(outcome.sink.clone()).or_default();
        if outcome.success {
            tally.successes += 1;
        } else {
            tally.failures += 1;
        }
        tally.latency_ms.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// Count one finished dispatch
    pub fn finish_dispatch(&mut self, posted: bool) {
        self.total_dispatches += 1;
        if posted {
            self.total_posted += 1;
        }
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_dispatches: self.total_dispatches,
            total_posted: self.total_posted,
            posted_rate: if self.total_dispatches > 0 {
                self.total_posted as f64 / self.total_dispatches as f64 * 100.0
            } else {
                0.0
            },
            sinks: self
                .sinks
                .iter()
                .map(|(name, tally)| SinkSummary {
                    name: name.clone(),
                    successes: tally.successes,
                    failures: tally.failures,
                    latency_ms: StatsSummary::from(&tally.latency_ms),
                })
                .collect(),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_dispatches: u64,
    pub total_posted: u64,
    pub posted_rate: f64,
    pub sinks: Vec<SinkSummary>,
}

/// One sink's line in the summary
#[derive(Debug, Clone, Default)]
pub struct SinkSummary {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Metrics Summary ===")?;
        writeln!(f, "Dispatched readings: {}", self.total_dispatches)?;
        writeln!(
            f,
            "Posted: {} ({:.2}%)",
            self.total_posted, self.posted_rate
        )?;
        for sink in &self.sinks {
            writeln!(
                f,
                "  {}: ok={} failed={} latency_ms: {}",
                sink.name, sink.successes, sink.failures, sink.latency_ms
            )?;
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
