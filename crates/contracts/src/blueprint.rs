//! RelayBlueprint - Config Loader output
//!
//! Describes the whole relay: where codes come from, the dedup window,
//! the delivery sinks and the durable store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Receiver settings
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// Deduplication window
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Delivery sinks, in dispatch order
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Durable store
    #[serde(default)]
    pub store: StoreConfig,
}

impl RelayBlueprint {
    /// The sink whose outcome becomes the persisted posted flag
    pub fn primary_sink(&self) -> Option<&SinkConfig> {
        self.sinks.iter().find(|sink| sink.primary)
    }
}

/// Receiver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Where raw codes come from
    #[serde(default)]
    pub source: SourceType,

    /// Replay file (replay source only)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = recorded pace)
    #[serde(default = "default_replay_speed")]
    pub speed: f64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            source: SourceType::default(),
            path: None,
            speed: default_replay_speed(),
        }
    }
}

fn default_replay_speed() -> f64 {
    1.0
}

/// Code source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Recorded codes from a text file
    Replay,
    /// One code per line on standard input
    #[default]
    Stdin,
}

/// Deduplication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Window in seconds, measured from the last accepted code
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,

    /// State scope
    #[serde(default)]
    pub scope: DedupScope,
}

impl DedupConfig {
    /// Window as a duration; values too large for a Duration saturate
    pub fn window(&self) -> Duration {
        Duration::try_from_secs_f64(self.window_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            scope: DedupScope::default(),
        }
    }
}

fn default_window_secs() -> f64 {
    30.0
}

/// Deduplication state scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// One (last code, last accepted) pair across all stations
    #[default]
    Global,
    /// One pair per station code
    PerStation,
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Outcome of this sink becomes the posted flag
    #[serde(default)]
    pub primary: bool,

    /// Pending delivery queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-delivery timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    /// Per-delivery timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_queue_capacity() -> usize {
    16
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// `{base}/input/{public_key}?private_key=..` telemetry endpoint
    Telemetry,
    /// `{base}{thing}?station=..` endpoint
    NamedThing,
    /// `{base}/update?api_key=..&field1=..` endpoint
    IndexedField,
    /// Publish/subscribe broker
    Mqtt,
}

impl SinkType {
    /// Whether the sink talks HTTP
    pub fn is_http(self) -> bool {
        matches!(self, Self::Telemetry | Self::NamedThing | Self::IndexedField)
    }

    /// Parameters that must be present for this sink type
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::Log => &[],
            Self::Telemetry => &[
                "base_url",
                "public_key_motion",
                "private_key_motion",
                "public_key_environment",
                "private_key_environment",
            ],
            Self::NamedThing => &["base_url", "thing_motion", "thing_environment"],
            Self::IndexedField => &["base_url", "api_key_motion", "api_key_environment"],
            Self::Mqtt => &[],
        }
    }
}

/// Durable store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Disable to run without persistence (every record fails as unavailable)
    #[serde(default = "default_store_enabled")]
    pub enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            enabled: default_store_enabled(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("sensors.db")
}

fn default_store_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_receiver_conventions() {
        let dedup = DedupConfig::default();
        assert_eq!(dedup.window(), Duration::from_secs(30));
        assert_eq!(dedup.scope, DedupScope::Global);
        assert_eq!(StoreConfig::default().path, PathBuf::from("sensors.db"));
    }

    #[test]
    fn oversized_window_saturates() {
        let dedup = DedupConfig {
            window_secs: 1e20,
            ..Default::default()
        };
        assert_eq!(dedup.window(), Duration::MAX);
    }

    #[test]
    fn primary_sink_lookup() {
        let sink = |name: &str, primary| SinkConfig {
            name: name.into(),
            sink_type: SinkType::Log,
            primary,
            queue_capacity: 4,
            timeout_ms: 1000,
            params: HashMap::new(),
        };
        let blueprint = RelayBlueprint {
            version: ConfigVersion::V1,
            receiver: ReceiverConfig::default(),
            dedup: DedupConfig::default(),
            sinks: vec![sink("a", false), sink("b", true)],
            store: StoreConfig::default(),
        };
        assert_eq!(blueprint.primary_sink().map(|s| s.name.as_str()), Some("b"));
    }

    #[test]
    fn http_types_require_base_url() {
        for kind in [SinkType::Telemetry, SinkType::NamedThing, SinkType::IndexedField] {
            assert!(kind.is_http());
            assert!(kind.required_params().contains(&"base_url"));
        }
        assert!(!SinkType::Mqtt.is_http());
    }
}
