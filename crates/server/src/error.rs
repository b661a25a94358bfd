//! Error types for the server crate

use thiserror::Error;
use tradebridge_core::CodecError;

/// Transport-level errors on a client channel
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Operation cancelled")]
    Cancelled,
}

impl TransportError {
    /// Cancellation is expected during shutdown and is never reported
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
