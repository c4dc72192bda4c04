//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, SourceType};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::relay::{Relay, RelayConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);

    info!(
        source = ?blueprint.receiver.source,
        window_secs = blueprint.dedup.window_secs,
        sinks = blueprint.sinks.len(),
        primary = blueprint.primary_sink().map(|s| s.name.as_str()).unwrap_or("-"),
        store = %blueprint.store.path.display(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let relay_config = RelayConfig {
        blueprint,
        max_readings: (args.max_readings > 0).then_some(args.max_readings),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting relay...");
    let stats = Relay::new(relay_config)
        .run(shutdown_signal())
        .await
        .context("Relay failed")?;

    info!(
        received = stats.received,
        accepted = stats.accepted,
        posted = stats.posted,
        store_failures = stats.store_failures,
        duration_secs = stats.duration.as_secs_f64(),
        "Relay finished"
    );
    stats.print_summary();

    Ok(())
}

/// Apply CLI overrides on top of the loaded configuration
fn apply_overrides(blueprint: &mut RelayBlueprint, args: &RunArgs) {
    if let Some(ref path) = args.replay {
        info!(path = %path.display(), "Replaying codes from CLI-provided file");
        blueprint.receiver.source = SourceType::Replay;
        blueprint.receiver.path = Some(path.clone());
    }
    if let Some(speed) = args.replay_speed {
        if speed > 0.0 {
            blueprint.receiver.speed = speed;
        } else {
            warn!(speed, "Ignoring non-positive replay speed");
        }
    }
    if let Some(ref store) = args.store {
        info!(path = %store.display(), "Overriding store path from CLI");
        blueprint.store.path = store.clone();
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, finishing current reading..."),
        _ = terminate => warn!("Received SIGTERM, finishing current reading..."),
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RelayBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Receiver:");
    println!("  Source: {:?}", blueprint.receiver.source);
    if let Some(ref path) = blueprint.receiver.path {
        println!("  Replay file: {} (x{})", path.display(), blueprint.receiver.speed);
    }

    println!("\nDedup:");
    println!("  Window: {}s ({:?})", blueprint.dedup.window_secs, blueprint.dedup.scope);

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            let marker = if sink.primary { " [primary]" } else { "" };
            println!("  - {} ({:?}){}", sink.name, sink.sink_type, marker);
        }
    }

    println!("\nStore:");
    if blueprint.store.enabled {
        println!("  SQLite: {}", blueprint.store.path.display());
    } else {
        println!("  Disabled");
    }

    println!();
}
