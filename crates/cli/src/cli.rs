//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// RF Relay - 433MHz sensor code relay
#[derive(Parser, Debug)]
#[command(
    name = "rf-relay",
    author,
    version,
    about = "433MHz sensor code relay",
    long_about = "Relays 32-bit codes from 433MHz motion and environment sensors.\n\n\
                  Decodes each code, drops radio retransmissions, fans readings out to \n\
                  HTTP endpoints and an MQTT broker, and records every reading in SQLite."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RF_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RF_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "RF_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Replay codes from this file instead of the configured source
    #[arg(long, env = "RF_RELAY_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Override the replay speed multiplier
    #[arg(long)]
    pub replay_speed: Option<f64>,

    /// Override the SQLite database path
    #[arg(long, env = "RF_RELAY_STORE")]
    pub store: Option<PathBuf>,

    /// Stop after this many accepted readings (0 = unlimited)
    #[arg(long, default_value = "0", env = "RF_RELAY_MAX_READINGS")]
    pub max_readings: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "RF_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Intake channel capacity
    #[arg(long, default_value = "100", env = "RF_RELAY_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "RF_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::parse_from([
            "rf-relay",
            "-v",
            "run",
            "--config",
            "relay.json",
            "--replay",
            "codes.txt",
            "--max-readings",
            "5",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("relay.json"));
                assert_eq!(args.replay, Some(PathBuf::from("codes.txt")));
                assert_eq!(args.max_readings, 5);
                assert_eq!(args.buffer_size, 100);
                assert_eq!(args.metrics_port, 0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["rf-relay", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
