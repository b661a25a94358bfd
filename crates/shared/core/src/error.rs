//! Error types for the core crate

use thiserror::Error;

/// Errors raised while encoding or decoding a message envelope
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(u8),
}
