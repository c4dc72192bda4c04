//! SinkDispatcher - fans one observation out to every sink

use tracing::{debug, info, instrument, warn};

use contracts::{DeliveryOutcome, Observation, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::{DeliveryReport, SinkHandle};
use crate::metrics::MetricsSnapshot;
use crate::sinks::{HttpSink, LogSink, MqttSink};

/// Result of dispatching one observation
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    /// One report per sink, in configuration order
    pub reports: Vec<DeliveryReport>,

    /// The primary sink's success (false when there is no primary)
    pub posted: bool,
}

impl Dispatch {
    /// Outcomes in configuration order
    pub fn outcomes(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.reports.iter().map(|report| &report.outcome)
    }

    /// Number of sinks that accepted the observation
    pub fn success_count(&self) -> usize {
        self.outcomes().filter(|outcome| outcome.success).count()
    }
}

/// The dispatcher that fans observations out to sinks
///
/// Every sink runs on its own worker, so a slow or failing sink never delays
/// or affects another. `dispatch` returns once every sink has answered or
/// timed out.
pub struct SinkDispatcher {
    handles: Vec<SinkHandle>,
    primary: Option<usize>,
}

impl SinkDispatcher {
    /// Create a dispatcher from running handles
    ///
    /// `primary` names the handle whose outcome becomes the posted flag.
    pub fn with_handles(handles: Vec<SinkHandle>, primary: Option<&str>) -> Self {
        let primary = primary.and_then(|name| handles.iter().position(|h| h.name() == name));
        Self { handles, primary }
    }

    /// A dispatcher with no sinks; nothing is ever posted
    pub fn empty() -> Self {
        Self {
            handles: Vec::new(),
            primary: None,
        }
    }

    /// Configured sink names, in dispatch order
    pub fn sink_names(&self) -> Vec<&str> {
        self.handles.iter().map(SinkHandle::name).collect()
    }

    /// Primary sink name
    pub fn primary_name(&self) -> Option<&str> {
        self.primary.map(|idx| self.handles[idx].name())
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Deliver one observation to every sink
    ///
    /// All requests are queued before any reply is awaited.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, observation),
        fields(code = observation.code, sinks = self.handles.len())
    )]
    pub async fn dispatch(&self, observation: &Observation) -> Dispatch {
        let pending: Vec<_> = self
            .handles
            .iter()
            .map(|handle| handle.submit(observation))
            .collect();

        let mut reports = Vec::with_capacity(pending.len());
        for delivery in pending {
            reports.push(delivery.report().await);
        }

        let posted = self
            .primary
            .and_then(|idx| reports.get(idx))
            .is_some_and(|report| report.outcome.success);

        if self.primary.is_some() && !posted {
            warn!(
                sink = self.primary_name().unwrap_or_default(),
                code = observation.code,
                "primary sink did not accept reading"
            );
        }

        debug!(posted, "dispatch complete");
        Dispatch { reports, posted }
    }

    /// Stop every sink worker after its queue drains
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown().await;
        }
        info!("Dispatcher shutdown complete");
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let timeout = config.timeout();
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity, timeout))
        }
        SinkType::Telemetry | SinkType::NamedThing | SinkType::IndexedField => {
            let sink = HttpSink::from_params(&config.name, config.sink_type, &config.params, timeout)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity, timeout))
        }
        SinkType::Mqtt => {
            let sink = MqttSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity, timeout))
        }
    }
}

/// Build a dispatcher from sink configs
///
/// Any sink that cannot be constructed aborts startup.
#[instrument(name = "dispatcher_create", skip(sink_configs), fields(sink_count = sink_configs.len()))]
pub async fn create_dispatcher(
    sink_configs: &[SinkConfig],
) -> Result<SinkDispatcher, DispatcherError> {
    let mut handles = Vec::with_capacity(sink_configs.len());
    for sink_config in sink_configs {
        handles.push(create_sink_handle(sink_config).await?);
    }

    let primary = sink_configs
        .iter()
        .find(|config| config.primary)
        .map(|config| config.name.as_str());

    info!(sinks = handles.len(), primary = ?primary, "Dispatcher started");
    Ok(SinkDispatcher::with_handles(handles, primary))
}
