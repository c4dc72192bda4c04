//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RelayBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    receiver: ReceiverInfo,
    dedup: DedupInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
    store: StoreInfo,
}

#[derive(Serialize)]
struct ReceiverInfo {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    speed: f64,
}

#[derive(Serialize)]
struct DedupInfo {
    window_secs: f64,
    scope: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    primary: bool,
    queue_capacity: usize,
    timeout_ms: u64,
    /// Parameter names only; values may hold keys
    params: Vec<String>,
}

#[derive(Serialize)]
struct StoreInfo {
    path: String,
    enabled: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| {
                let mut params: Vec<String> = s.params.keys().cloned().collect();
                params.sort();
                SinkInfo {
                    name: s.name.clone(),
                    sink_type: format!("{:?}", s.sink_type),
                    primary: s.primary,
                    queue_capacity: s.queue_capacity,
                    timeout_ms: s.timeout_ms,
                    params,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        receiver: ReceiverInfo {
            source: format!("{:?}", blueprint.receiver.source),
            path: blueprint
                .receiver
                .path
                .as_ref()
                .map(|p| p.display().to_string()),
            speed: blueprint.receiver.speed,
        },
        dedup: DedupInfo {
            window_secs: blueprint.dedup.window_secs,
            scope: format!("{:?}", blueprint.dedup.scope),
        },
        sinks,
        store: StoreInfo {
            path: blueprint.store.path.display().to_string(),
            enabled: blueprint.store.enabled,
        },
    }
}

fn print_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  RF Relay Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Receiver");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Source: {:?}", blueprint.receiver.source);
    match &blueprint.receiver.path {
        Some(path) => {
            println!("   ├─ Replay file: {}", path.display());
            println!("   └─ Speed: x{}", blueprint.receiver.speed);
        }
        None => println!("   └─ Replay file: (none)"),
    }

    println!("\n⚙️  Dedup");
    println!("   ├─ Window: {}s", blueprint.dedup.window_secs);
    println!("   └─ Scope: {:?}", blueprint.dedup.scope);

    println!("\n📤 Sinks ({})", blueprint.sinks.len());
    for (i, sink) in blueprint.sinks.iter().enumerate() {
        let is_last = i == blueprint.sinks.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let marker = if sink.primary { " [primary]" } else { "" };

        println!("   {} {} ({:?}){}", prefix, sink.name, sink.sink_type, marker);
        if args.sinks {
            println!(
                "   {}  ├─ queue: {}, timeout: {}ms",
                child_prefix, sink.queue_capacity, sink.timeout_ms
            );
            let mut keys: Vec<&str> = sink.params.keys().map(String::as_str).collect();
            keys.sort_unstable();
            println!("   {}  └─ params: {}", child_prefix, keys.join(", "));
        }
    }

    println!("\n💾 Store");
    println!("   ├─ Path: {}", blueprint.store.path.display());
    println!("   └─ Enabled: {}", blueprint.store.enabled);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_hides_param_values() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            r#"
[[sinks]]
name = "things"
sink_type = "indexed_field"
primary = true
params = { base_url = "https://example.test", api_key_motion = "SECRET1", api_key_environment = "SECRET2" }
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        let args = InfoArgs {
            config: "relay.toml".into(),
            json: true,
            sinks: true,
        };

        let info = build_config_info(&blueprint, &args);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("api_key_motion"));
        assert!(!json.contains("SECRET1"));
        assert_eq!(info.sinks[0].params.len(), 3);
    }
}
