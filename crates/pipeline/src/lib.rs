//! # Pipeline
//!
//! Sequential per-code cycle: decode, deduplicate, dispatch, persist.
//!
//! Processes at most one code at a time end to end. The dedup state is updated
//! before any sink sees the reading, and the posted flag written to the store is
//! the primary sink's outcome for that same cycle.
//!
//! ## Usage
//!
//! ```ignore
//! use pipeline::{Pipeline, RunLimits};
//!
//! let pipeline = Pipeline::new(dedup, dispatcher, Box::new(store));
//! let stats = pipeline.run(intake_rx, RunLimits::default()).await;
//! stats.print_summary();
//! ```

mod cycle;
mod stats;

pub use cycle::{CycleOutcome, CycleReport, Pipeline, RunLimits};
pub use stats::PipelineStats;
