//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, SinkType, SourceType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source: String,
    dedup_window_secs: f64,
    sink_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_sink: Option<String>,
    store_path: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    source: format!("{:?}", blueprint.receiver.source),
                    dedup_window_secs: blueprint.dedup.window_secs,
                    sink_count: blueprint.sinks.len(),
                    primary_sink: blueprint.primary_sink().map(|s| s.name.clone()),
                    store_path: blueprint.store.path.display().to_string(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - every reading will be stored as not posted".to_string());
    }

    if !blueprint.store.enabled {
        warnings.push("Store disabled - readings will not be persisted".to_string());
    }

    for sink in &blueprint.sinks {
        if sink.sink_type == SinkType::Mqtt && !sink.params.contains_key("host") {
            warnings.push(format!(
                "Sink '{}' has no broker host - using localhost",
                sink.name
            ));
        }
        if sink.sink_type == SinkType::IndexedField {
            warnings.push(format!(
                "Sink '{}' writes motion and humidity to the same field2",
                sink.name
            ));
        }
    }

    if blueprint.receiver.source == SourceType::Stdin && blueprint.receiver.path.is_some() {
        warnings.push("receiver.path is ignored for the stdin source".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Source: {}", summary.source);
            println!("  Dedup window: {}s", summary.dedup_window_secs);
            println!("  Sinks: {}", summary.sink_count);
            if let Some(ref primary) = summary.primary_sink {
                println!("  Primary sink: {}", primary);
            }
            println!("  Store: {}", summary.store_path);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
