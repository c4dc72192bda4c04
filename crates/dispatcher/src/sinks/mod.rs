//! Sink implementations
//!
//! Contains LogSink, HttpSink, and MqttSink.

mod http;
mod log;
mod mqtt;

pub use self::http::{HttpLayout, HttpSink, HttpSinkConfig};
pub use self::log::LogSink;
pub use self::mqtt::{payload_for, topic_for, MqttSink, MqttSinkConfig};
