//! LogSink - logs each reading via tracing

use contracts::{ContractError, DeliveryReceipt, DeliverySink, Observation, Reading};
use tracing::{info, instrument};

/// Sink that logs decoded readings, always succeeds
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_reading(&self, observation: &Observation) {
        match observation.reading {
            Reading::Motion(motion) => info!(
                sink = %self.name,
                station = %motion.station,
                motion = motion.motion,
                "motion reading"
            ),
            Reading::Environment(env) => info!(
                sink = %self.name,
                station = %env.station,
                temperature_f = env.temperature_f,
                humidity_pct = env.humidity_pct,
                battery_mv = env.battery_millivolts,
                "environment reading"
            ),
        }
    }
}

impl DeliverySink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_deliver",
        skip(self, observation),
        fields(sink = %self.name, code = observation.code)
    )]
    async fn deliver(&mut self, observation: &Observation) -> Result<DeliveryReceipt, ContractError> {
        self.log_reading(observation);
        Ok(DeliveryReceipt::default())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
