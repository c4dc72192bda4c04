//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Code source could not be set up
    #[error("Failed to set up code source: {message}")]
    SourceSetup { message: String },

    /// Sinks could not be built
    #[error("Failed to set up sinks: {message}")]
    SinkSetup { message: String },

    /// Metrics exporter could not start
    #[error("Failed to start metrics exporter on port {port}: {message}")]
    Metrics { port: u16, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn source_setup(message: impl Into<String>) -> Self {
        Self::SourceSetup {
            message: message.into(),
        }
    }

    pub fn sink_setup(message: impl Into<String>) -> Self {
        Self::SinkSetup {
            message: message.into(),
        }
    }

    pub fn metrics(port: u16, message: impl Into<String>) -> Self {
        Self::Metrics {
            port,
            message: message.into(),
        }
    }
}
