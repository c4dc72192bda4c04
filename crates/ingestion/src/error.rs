//! Ingestion error types

use thiserror::Error;

/// Decoder error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The receiver's unknown-encoding sentinel (code 0)
    #[error("unrecognized encoding")]
    Unrecognized,
}

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Replay line could not be parsed
    #[error("replay line {line}: {message}")]
    ReplayParse {
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },

    /// Receiver already taken
    #[error("intake receiver already taken")]
    ReceiverTaken,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
