//! Pipeline statistics

use std::time::Duration;

use observability::DeliveryMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Codes taken from the intake
    pub received: u64,

    /// Sentinel codes
    pub unrecognized: u64,

    /// Codes discarded as retransmissions
    pub duplicates: u64,

    /// Readings that went through dispatch
    pub accepted: u64,

    /// Readings the primary sink accepted
    pub posted: u64,

    /// Readings that could not be stored
    pub store_failures: u64,

    /// Codes dropped at a full intake (filled in by the caller)
    pub intake_dropped: u64,

    /// Number of configured sinks
    pub active_sinks: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-sink delivery tallies
    pub deliveries: DeliveryMetricsAggregator,
}

impl PipelineStats {
    /// Accepted readings per minute
    pub fn readings_per_minute(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.accepted as f64 * 60.0 / secs
        } else {
            0.0
        }
    }

    /// Share of recognized codes discarded as duplicates, in percent
    pub fn duplicate_rate(&self) -> f64 {
        let recognized = self.accepted + self.duplicates;
        if recognized > 0 {
            self.duplicates as f64 / recognized as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Relay Statistics                          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Codes received: {}", self.received);
        println!("   ├─ Unrecognized: {}", self.unrecognized);
        println!(
            "   ├─ Duplicates: {} ({:.2}%)",
            self.duplicates,
            self.duplicate_rate()
        );
        println!("   ├─ Intake drops: {}", self.intake_dropped);
        println!("   ├─ Readings accepted: {}", self.accepted);
        println!("   ├─ Readings/min: {:.2}", self.readings_per_minute());
        println!("   └─ Active sinks: {}", self.active_sinks);

        let summary = self.deliveries.summary();

        println!("\n📤 Delivery");
        println!(
            "   ├─ Posted by primary: {} ({:.2}%)",
            summary.total_posted, summary.posted_rate
        );
        println!("   └─ Store failures: {}", self.store_failures);

        if !summary.sinks.is_empty() {
            println!("\n📈 Per-sink");
            for (i, sink) in summary.sinks.iter().enumerate() {
                let prefix = if i == summary.sinks.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: ok={} failed={} latency_ms: {}",
                    prefix, sink.name, sink.successes, sink.failures, sink.latency_ms
                );
            }
        }

        println!();
    }
}
