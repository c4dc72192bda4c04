//! Delivery outcomes - Dispatcher output

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a sink reports back for one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Sink name
    pub sink: String,

    /// Whether the sink accepted the reading
    pub success: bool,

    /// Response status or error text
    pub detail: Option<OutcomeDetail>,
}

impl DeliveryOutcome {
    /// Successful delivery
    pub fn delivered(sink: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            sink: sink.into(),
            success: true,
            detail: status.map(OutcomeDetail::Status),
        }
    }

    /// Rejected with a response status
    pub fn rejected(sink: impl Into<String>, status: u16) -> Self {
        Self {
            sink: sink.into(),
            success: false,
            detail: Some(OutcomeDetail::Status(status)),
        }
    }

    /// Failed without a usable response
    pub fn failed(sink: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            success: false,
            detail: Some(OutcomeDetail::Error(error.into())),
        }
    }
}

/// Outcome detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeDetail {
    Status(u16),
    Error(String),
}

impl fmt::Display for OutcomeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "status {code}"),
            Self::Error(message) => f.write_str(message),
        }
    }
}

/// Receipt returned by a sink that accepted a reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Transport status, when the transport has one
    pub status: Option<u16>,
}

impl DeliveryReceipt {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
        }
    }
}
