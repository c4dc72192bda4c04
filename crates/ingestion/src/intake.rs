//! Intake channel
//!
//! Bridges callback-style code sources to the single sequential pipeline
//! consumer through one bounded channel.

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{CodeCallback, CodeSource, RawCode};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{IntakeConfig, IntakeMetrics};
use crate::error::{IngestionError, Result};

/// Intake channel
///
/// Sources registered here feed one bounded channel. Once `start_all` has handed
/// out the sender, the channel closes as soon as every source has finished, so
/// a finite replay ends the pipeline run on its own.
pub struct IntakeChannel {
    /// Registered sources
    sources: Vec<Box<dyn CodeSource>>,

    /// Shared metrics
    metrics: Arc<IntakeMetrics>,

    /// Sender, given to sources on start
    tx: Option<Sender<RawCode>>,

    /// Receiver, taken by the pipeline
    rx: Option<Receiver<RawCode>>,
}

impl IntakeChannel {
    /// Create a new intake with the given capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(IntakeConfig { channel_capacity })
    }

    /// Create with custom configuration
    pub fn with_config(config: IntakeConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            sources: Vec::new(),
            metrics: Arc::new(IntakeMetrics::new()),
            tx: Some(tx),
            rx: Some(rx),
        }
    }

    /// Register a code source
    #[instrument(name = "intake_register_source", skip(self, source), fields(source = %source.name()))]
    pub fn register_source(&mut self, source: Box<dyn CodeSource>) {
        debug!(source = %source.name(), "registered code source");
        self.sources.push(source);
    }

    /// Start every registered source
    ///
    /// The intake keeps no sender of its own afterwards.
    #[instrument(name = "intake_start_all", skip(self))]
    pub fn start_all(&mut self) {
        let Some(tx) = self.tx.take() else {
            warn!("intake already started");
            return;
        };

        info!(count = self.sources.len(), "starting code sources");
        for source in &self.sources {
            if !source.is_listening() {
                source.listen(make_callback(
                    source.name().to_string(),
                    tx.clone(),
                    Arc::clone(&self.metrics),
                ));
            }
        }
    }

    /// Stop every source
    #[instrument(name = "intake_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping code sources");
        for source in &self.sources {
            if source.is_listening() {
                debug!(source = %source.name(), "stopping source");
                source.stop();
            }
        }
    }

    /// Take the receiving end
    ///
    /// Can only be taken once.
    pub fn take_receiver(&mut self) -> Result<Receiver<RawCode>> {
        self.rx.take().ok_or(IngestionError::ReceiverTaken)
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IntakeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Registered source count
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

impl Drop for IntakeChannel {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn make_callback(
    source: String,
    tx: Sender<RawCode>,
    metrics: Arc<IntakeMetrics>,
) -> CodeCallback {
    Arc::new(move |code: RawCode| {
        metrics.record_received();
        match tx.try_send(code) {
            Ok(()) => {
                metrics.update_queue_len(tx.len());
                trace!(source = %source, code = code.value, "code queued");
            }
            Err(TrySendError::Full(dropped)) => {
                metrics.record_dropped();
                warn!(source = %source, code = dropped.value, "intake full, code dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(source = %source, "intake closed");
            }
        }
    })
}
