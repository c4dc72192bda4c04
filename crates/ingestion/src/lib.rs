//! # Ingestion
//!
//! Front half of the relay pipeline.
//!
//! Responsibilities:
//! - Receive raw codes from callback-style sources through a bounded intake
//! - Decode 32-bit codes into typed readings
//! - Suppress radio retransmissions with a time-windowed gate

pub mod config;
pub mod decoder;
pub mod dedup;
pub mod error;
pub mod intake;
pub mod sources;

pub use config::{IntakeConfig, IntakeMetrics, MetricsSnapshot};
pub use decoder::{decode, RawFields};
pub use dedup::{DedupState, Deduplicator};
pub use error::{DecodeError, IngestionError, Result};
pub use intake::IntakeChannel;
pub use sources::{ReplayConfig, ReplaySource, ScriptedSource, ScriptedStep, StdinSource};
