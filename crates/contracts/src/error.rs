//! Layered error definitions
//!
//! Categorized by source: config / sink / store

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink transport error (connection, DNS, protocol)
    #[error("sink '{sink_name}' transport error: {message}")]
    SinkTransport { sink_name: String, message: String },

    /// Sink answered but did not accept the reading
    #[error("sink '{sink_name}' rejected delivery with status {status}: {message}")]
    SinkRejected {
        sink_name: String,
        status: u16,
        message: String,
    },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink transport error
    pub fn sink_transport(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkTransport {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink rejection error
    pub fn sink_rejected(
        sink_name: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::SinkRejected {
            sink_name: sink_name.into(),
            status,
            message: message.into(),
        }
    }

    /// Response status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SinkRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Durable store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be opened or is not connected
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Insert rejected
    #[error("store write to '{table}' failed: {message}")]
    Write {
        table: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Create unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
