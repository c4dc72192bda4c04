//! Config parsing
//!
//! TOML (primary) and JSON (optional) formats.

use contracts::{ContractError, RelayBlueprint};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML config
pub fn parse_toml(content: &str) -> Result<RelayBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON config
pub fn parse_json(content: &str) -> Result<RelayBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse config in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DedupScope, SinkType, SourceType};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[receiver]
source = "replay"
path = "codes.txt"

[[sinks]]
name = "log_sink"
sink_type = "log"
primary = true
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.receiver.source, SourceType::Replay);
        assert_eq!(bp.sinks.len(), 1);
        assert_eq!(bp.sinks[0].queue_capacity, 16);
        assert_eq!(bp.sinks[0].timeout_ms, 10_000);
        assert_eq!(bp.dedup.window_secs, 30.0);
        assert!(bp.store.enabled);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "dedup": { "window_secs": 45.0, "scope": "per_station" },
            "sinks": [{
                "name": "broker",
                "sink_type": "mqtt",
                "primary": true,
                "params": { "host": "localhost" }
            }],
            "store": { "path": "/tmp/relay.db" }
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.dedup.scope, DedupScope::PerStation);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Mqtt);
        assert_eq!(bp.sinks[0].params.get("host").map(String::as_str), Some("localhost"));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_sink_type_is_parse_error() {
        let content = r#"
[[sinks]]
name = "x"
sink_type = "carrier_pigeon"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
