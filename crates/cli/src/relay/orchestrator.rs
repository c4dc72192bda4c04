//! Relay orchestrator - assembles the source, sinks and store around a pipeline.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{
    CodeSource, PersistenceLog, ReceiverConfig, RelayBlueprint, SourceType, StoreConfig,
    UnavailableLog,
};
use ingestion::{Deduplicator, IntakeChannel, ReplayConfig, ReplaySource, StdinSource};
use persistence::SqliteLog;
use pipeline::{Pipeline, PipelineStats, RunLimits};
use tracing::{error, info, warn};

use crate::error::CliError;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Loaded blueprint, CLI overrides applied
    pub blueprint: RelayBlueprint,

    /// Maximum number of accepted readings (None = unlimited)
    pub max_readings: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Intake channel capacity
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run until the source ends, a limit hits, or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)
                .map_err(|e| CliError::metrics(port, format!("{e:#}")))?;
            info!("Metrics endpoint available on port {}", port);
        }

        let source = build_source(&blueprint.receiver)?;
        info!(source = %source.name(), "Code source ready");

        let mut intake = IntakeChannel::new(self.config.buffer_size);
        intake.register_source(source);

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - readings will be stored as not posted");
        }
        let dispatcher = dispatcher::create_dispatcher(&blueprint.sinks)
            .await
            .map_err(|e| CliError::sink_setup(e.to_string()))?;

        let store = open_store(&blueprint.store);
        let dedup = Deduplicator::new(&blueprint.dedup);
        info!(
            window_secs = dedup.window().as_secs_f64(),
            scope = ?blueprint.dedup.scope,
            "Deduplicator configured"
        );

        let pipeline = Pipeline::new(dedup, dispatcher, store);

        intake.start_all();
        let rx = intake
            .take_receiver()
            .context("Failed to get intake receiver")?;

        let limits = RunLimits {
            max_readings: self.config.max_readings,
        };
        let stop = stop_signal(shutdown, self.config.timeout);

        let mut stats = pipeline.run_until(rx, limits, stop).await;

        info!("Stopping code sources...");
        intake.stop_all();
        stats.intake_dropped = intake.metrics().snapshot().codes_dropped;

        Ok(stats)
    }
}

/// Resolve on `shutdown` or once `timeout` elapses
async fn stop_signal<F>(shutdown: F, timeout: Option<Duration>)
where
    F: Future<Output = ()>,
{
    match timeout {
        Some(timeout) => {
            tokio::select! {
                _ = shutdown => {}
                _ = tokio::time::sleep(timeout) => {
                    warn!(timeout_secs = timeout.as_secs(), "Relay timed out");
                }
            }
        }
        None => shutdown.await,
    }
}

/// Build the configured code source
fn build_source(receiver: &ReceiverConfig) -> Result<Box<dyn CodeSource>, CliError> {
    match receiver.source {
        SourceType::Replay => {
            let path = receiver
                .path
                .as_deref()
                .ok_or_else(|| CliError::source_setup("replay source requires a path"))?;
            let config = ReplayConfig {
                speed_multiplier: receiver.speed,
            };
            let source = ReplaySource::load(path, config).map_err(|e| {
                CliError::source_setup(format!("{}: {}", path.display(), e))
            })?;
            info!(path = %path.display(), codes = source.len(), speed = receiver.speed, "Replay loaded");
            Ok(Box::new(source))
        }
        SourceType::Stdin => {
            info!("Reading codes from standard input");
            Ok(Box::new(StdinSource::new()))
        }
    }
}

/// Open the store, falling back to an always-failing log
///
/// A store that cannot be opened is not fatal: every cycle logs the failure.
fn open_store(config: &StoreConfig) -> Box<dyn PersistenceLog> {
    if !config.enabled {
        warn!("Store disabled - readings will not be persisted");
        return Box::new(UnavailableLog::new("store disabled in configuration"));
    }

    match SqliteLog::open(&config.path) {
        Ok(log) => Box::new(log),
        Err(e) => {
            error!(path = %config.path.display(), error = %e, "Store unavailable, continuing without persistence");
            Box::new(UnavailableLog::new(e.to_string()))
        }
    }
}
