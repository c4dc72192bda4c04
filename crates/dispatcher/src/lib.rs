//! # Dispatcher
//!
//! Multi-sink delivery for accepted readings.
//!
//! Responsibilities:
//! - Fan every observation out to all configured sinks
//! - Isolate slow or failing sinks behind their own worker and timeout
//! - Derive the posted flag from the primary sink

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DeliveryOutcome, DeliverySink, Observation};
pub use dispatcher::{create_dispatcher, Dispatch, SinkDispatcher};
pub use error::DispatcherError;
pub use handle::{DeliveryReport, PendingDelivery, SinkHandle};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{HttpLayout, HttpSink, HttpSinkConfig, LogSink, MqttSink, MqttSinkConfig};
