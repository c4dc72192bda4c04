//! HttpSink - query-string GET delivery to hosted telemetry services
//!
//! Three URL layouts are supported:
//!
//! | Layout         | URL                                                                  |
//! |----------------|----------------------------------------------------------------------|
//! | `Telemetry`    | `{base}/input/{public_key}?private_key=..&station=..&<fields>`       |
//! | `NamedThing`   | `{base}{thing}?station=..&<fields>`                                  |
//! | `IndexedField` | `{base}/update?api_key=..&field1=station&field2=..&field3=..&field4=..` |
//!
//! `<fields>` is `motion=..` or `humidity=..&temp=..&voltage=..`. Decimal
//! values always carry one fractional digit.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{
    ContractError, DeliveryReceipt, DeliverySink, Observation, Reading, ReadingKind, SinkType,
};
use reqwest::{Client, Url};
use tracing::{debug, instrument};

/// URL layout of the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpLayout {
    Telemetry,
    NamedThing,
    IndexedField,
}

impl HttpLayout {
    /// Layout for an HTTP sink type
    pub fn from_sink_type(sink_type: SinkType) -> Option<Self> {
        match sink_type {
            SinkType::Telemetry => Some(Self::Telemetry),
            SinkType::NamedThing => Some(Self::NamedThing),
            SinkType::IndexedField => Some(Self::IndexedField),
            SinkType::Log | SinkType::Mqtt => None,
        }
    }
}

/// Per-kind credential or resource name
#[derive(Debug, Clone, PartialEq, Eq)]
struct PerKind {
    motion: String,
    environment: String,
}

impl PerKind {
    fn from_params(params: &HashMap<String, String>, prefix: &str) -> Result<Self, String> {
        Ok(Self {
            motion: require(params, &format!("{prefix}_motion"))?,
            environment: require(params, &format!("{prefix}_environment"))?,
        })
    }

    fn get(&self, kind: ReadingKind) -> &str {
        match kind {
            ReadingKind::Motion => &self.motion,
            ReadingKind::Environment => &self.environment,
        }
    }
}

/// Configuration for HttpSink
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    pub layout: HttpLayout,
    pub base_url: String,
    /// Request timeout (also bounded by the worker)
    pub timeout: Duration,
    public_keys: Option<PerKind>,
    private_keys: Option<PerKind>,
    things: Option<PerKind>,
    api_keys: Option<PerKind>,
}

impl HttpSinkConfig {
    /// Create config from params map
    pub fn from_params(
        layout: HttpLayout,
        params: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let base_url = require(params, "base_url")?;
        Url::parse(&base_url).map_err(|e| format!("invalid base_url '{}': {}", base_url, e))?;

        let mut config = Self {
            layout,
            base_url,
            timeout,
            public_keys: None,
            private_keys: None,
            things: None,
            api_keys: None,
        };

        match layout {
            HttpLayout::Telemetry => {
                config.public_keys = Some(PerKind::from_params(params, "public_key")?);
                config.private_keys = Some(PerKind::from_params(params, "private_key")?);
            }
            HttpLayout::NamedThing => {
                config.things = Some(PerKind::from_params(params, "thing")?);
            }
            HttpLayout::IndexedField => {
                config.api_keys = Some(PerKind::from_params(params, "api_key")?);
            }
        }

        Ok(config)
    }

    /// Build the request URL for a reading
    pub fn request_url(&self, reading: &Reading) -> Result<Url, String> {
        let kind = reading.kind();
        let base = self.base_url.trim_end_matches('/');

        let address = match self.layout {
            HttpLayout::Telemetry => {
                format!("{}/input/{}", base, lookup(&self.public_keys, kind)?)
            }
            // Thing names append directly to the base, which usually ends in '/'.
            HttpLayout::NamedThing => format!("{}{}", self.base_url, lookup(&self.things, kind)?),
            HttpLayout::IndexedField => format!("{}/update", base),
        };
        let mut url =
            Url::parse(&address).map_err(|e| format!("invalid url '{}': {}", address, e))?;

        let station = reading.station().to_string();
        let mut pairs: Vec<(&str, String)> = Vec::with_capacity(6);
        match self.layout {
            HttpLayout::Telemetry => {
                pairs.push(("private_key", lookup(&self.private_keys, kind)?.to_string()));
                pairs.push(("station", station));
                push_fields(&mut pairs, reading, ["motion", "humidity", "temp", "voltage"]);
            }
            HttpLayout::NamedThing => {
                pairs.push(("station", station));
                push_fields(&mut pairs, reading, ["motion", "humidity", "temp", "voltage"]);
            }
            HttpLayout::IndexedField => {
                pairs.push(("api_key", lookup(&self.api_keys, kind)?.to_string()));
                pairs.push(("field1", station));
                // Motion and humidity share field2.
                push_fields(&mut pairs, reading, ["field2", "field2", "field3", "field4"]);
            }
        }
        url.query_pairs_mut().extend_pairs(pairs);

        Ok(url)
    }
}

/// Append the reading's value pairs under `[motion, humidity, temp, voltage]` keys
fn push_fields<'k>(pairs: &mut Vec<(&'k str, String)>, reading: &Reading, keys: [&'k str; 4]) {
    let [motion_key, humidity_key, temp_key, voltage_key] = keys;
    match reading {
        Reading::Motion(motion) => {
            pairs.push((motion_key, motion.motion.to_string()));
        }
        Reading::Environment(env) => {
            pairs.push((humidity_key, format!("{:.1}", env.humidity_pct)));
            pairs.push((temp_key, format!("{:.1}", env.temperature_f)));
            pairs.push((voltage_key, format!("{:.1}", env.battery_millivolts)));
        }
    }
}

fn lookup(values: &Option<PerKind>, kind: ReadingKind) -> Result<&str, String> {
    values
        .as_ref()
        .map(|values| values.get(kind))
        .ok_or_else(|| "layout is missing its keys".to_string())
}

fn require(params: &HashMap<String, String>, key: &str) -> Result<String, String> {
    params
        .get(key)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| format!("missing '{}' parameter", key))
}

/// Sink that GETs one URL per reading
pub struct HttpSink {
    name: String,
    config: HttpSinkConfig,
    client: Client,
}

impl HttpSink {
    /// Create a new HttpSink
    pub fn new(name: impl Into<String>, config: HttpSinkConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| format!("failed to build http client: {}", e))?;

        Ok(Self {
            name: name.into(),
            config,
            client,
        })
    }

    /// Create from a sink type and params map
    pub fn from_params(
        name: &str,
        sink_type: SinkType,
        params: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let layout = HttpLayout::from_sink_type(sink_type)
            .ok_or_else(|| format!("{:?} is not an http sink type", sink_type))?;
        let config = HttpSinkConfig::from_params(layout, params, timeout)?;
        Self::new(name, config)
    }

    /// Indexed-field services answer with the new entry id; 0 means not accepted
    fn check_entry_id(&self, status: u16, body: &str) -> Result<(), ContractError> {
        match body.trim().parse::<u64>() {
            Ok(0) => Err(ContractError::sink_rejected(
                &self.name,
                status,
                "update not accepted (entry id 0)",
            )),
            Ok(_) => Ok(()),
            Err(_) => Err(ContractError::sink_rejected(
                &self.name,
                status,
                format!("unexpected response body: {:?}", truncate(body)),
            )),
        }
    }
}

fn truncate(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(64)
        .map(|(idx, _)| idx)
        .unwrap_or(body.len());
    &body[..end]
}

impl DeliverySink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_sink_deliver",
        skip(self, observation),
        fields(sink = %self.name, layout = ?self.config.layout, code = observation.code)
    )]
    async fn deliver(&mut self, observation: &Observation) -> Result<DeliveryReceipt, ContractError> {
        let url = self
            .config
            .request_url(&observation.reading)
            .map_err(|e| ContractError::sink_transport(&self.name, e))?;

        debug!(sink = %self.name, path = url.path(), "sending request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ContractError::sink_transport(&self.name, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ContractError::sink_transport(&self.name, e.to_string()))?;

        if !status.is_success() {
            return Err(ContractError::sink_rejected(
                &self.name,
                status.as_u16(),
                truncate(&body),
            ));
        }

        if self.config.layout == HttpLayout::IndexedField {
            self.check_entry_id(status.as_u16(), &body)?;
        }

        Ok(DeliveryReceipt::with_status(status.as_u16()))
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
