//! MqttSink - publishes raw codes to a broker
//!
//! Topic `stations/{station}/{pir|dht}`, payload the decimal raw code,
//! QoS 0 and never retained.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, DeliveryReceipt, DeliverySink, Observation, Reading};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Broker topic for a reading
pub fn topic_for(reading: &Reading) -> String {
    format!(
        "stations/{}/{}",
        reading.station(),
        reading.kind().topic_segment()
    )
}

/// Broker payload for an observation
pub fn payload_for(observation: &Observation) -> String {
    observation.code.to_string()
}

/// Configuration for MqttSink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSinkConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Pause before reconnecting after a connection error
    pub reconnect_delay: Duration,
    /// Client request queue capacity
    pub capacity: usize,
}

impl Default for MqttSinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "client_1".to_string(),
            keep_alive: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(5),
            capacity: 64,
        }
    }
}

impl MqttSinkConfig {
    /// Create config from params map; every key is optional
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let defaults = Self::default();

        let port = match params.get("port") {
            Some(port) => port
                .parse()
                .map_err(|e| format!("invalid port '{}': {}", port, e))?,
            None => defaults.port,
        };
        let keep_alive = parse_secs(params, "keep_alive_secs")?.unwrap_or(defaults.keep_alive);
        let reconnect_delay =
            parse_secs(params, "reconnect_delay_secs")?.unwrap_or(defaults.reconnect_delay);

        Ok(Self {
            host: params.get("host").cloned().unwrap_or(defaults.host),
            port,
            client_id: params.get("client_id").cloned().unwrap_or(defaults.client_id),
            keep_alive,
            reconnect_delay,
            capacity: defaults.capacity,
        })
    }
}

fn parse_secs(params: &HashMap<String, String>, key: &str) -> Result<Option<Duration>, String> {
    params
        .get(key)
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| format!("invalid {} '{}': {}", key, value, e))
        })
        .transpose()
}

/// Sink that publishes to an MQTT broker
///
/// The connection is driven by a background task. A delivery fails while
/// the broker has not acknowledged the current connection; otherwise it
/// succeeds once the client accepts the publish.
pub struct MqttSink {
    name: String,
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    event_task: JoinHandle<()>,
}

impl MqttSink {
    /// Create a sink and start its connection task
    ///
    /// Must be called within a tokio runtime.
    pub fn new(name: impl Into<String>, config: MqttSinkConfig) -> Self {
        let name = name.into();
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);

        let (client, event_loop) = AsyncClient::new(options, config.capacity);

        info!(
            sink = %name,
            broker = %format!("{}:{}", config.host, config.port),
            client_id = %config.client_id,
            "MqttSink created"
        );

        let connected = Arc::new(AtomicBool::new(false));
        let event_task = tokio::spawn(drive_connection(
            name.clone(),
            event_loop,
            Arc::clone(&connected),
            config.reconnect_delay,
        ));

        Self {
            name,
            client,
            connected,
            event_task,
        }
    }

    /// Whether the broker acknowledged the current connection
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Create from a params map
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> Result<Self, String> {
        Ok(Self::new(name, MqttSinkConfig::from_params(params)?))
    }
}

/// Poll the event loop until the client goes away
async fn drive_connection(
    name: String,
    mut event_loop: EventLoop,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let accepted = ack.code == ConnectReturnCode::Success;
                connected.store(accepted, Ordering::Release);
                if accepted {
                    info!(sink = %name, "connected to broker");
                } else {
                    warn!(sink = %name, code = ?ack.code, "broker refused the connection");
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Release);
                warn!(sink = %name, "broker closed the connection");
            }
            Ok(event) => {
                debug!(sink = %name, event = ?event, "mqtt event");
            }
            Err(ConnectionError::RequestsDone) => {
                connected.store(false, Ordering::Release);
                debug!(sink = %name, "mqtt client dropped");
                break;
            }
            Err(e) => {
                connected.store(false, Ordering::Release);
                warn!(
                    sink = %name,
                    error = %e,
                    retry_in_secs = reconnect_delay.as_secs(),
                    "broker connection error"
                );
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

impl DeliverySink for MqttSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "mqtt_sink_deliver",
        skip(self, observation),
        fields(sink = %self.name, code = observation.code)
    )]
    async fn deliver(&mut self, observation: &Observation) -> Result<DeliveryReceipt, ContractError> {
        if !self.is_connected() {
            return Err(ContractError::SinkConnection {
                sink_name: self.name.clone(),
                message: "not connected to broker".to_string(),
            });
        }

        let topic = topic_for(&observation.reading);
        let payload = payload_for(observation);

        self.client
            .publish(&topic, QoS::AtMostOnce, false, payload.into_bytes())
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: self.name.clone(),
                message: e.to_string(),
            })?;

        debug!(sink = %self.name, topic = %topic, "published");
        Ok(DeliveryReceipt::default())
    }

    #[instrument(name = "mqtt_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Err(e) = self.client.disconnect().await {
            debug!(sink = %self.name, error = %e, "disconnect failed");
        }
        self.event_task.abort();
        info!(sink = %self.name, "MqttSink closed");
        Ok(())
    }
}
