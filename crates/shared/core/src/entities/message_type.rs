use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Kind of a trading message
///
/// Only `Handshake` changes server-side state; every other kind is
/// forwarded as opaque data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum MessageType {
    #[default]
    Unknown = 0,
    /// Reveals the sender's platform and display name
    Handshake = 1,
    /// Keep-alive
    Heartbeat = 2,
    MarketData = 3,
    OrderRequest = 4,
    OrderConfirmation = 5,
    PositionUpdate = 6,
    AccountInfo = 7,
    Error = 8,
    Disconnect = 9,
    Custom = 10,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Handshake => "Handshake",
            Self::Heartbeat => "Heartbeat",
            Self::MarketData => "MarketData",
            Self::OrderRequest => "OrderRequest",
            Self::OrderConfirmation => "OrderConfirmation",
            Self::PositionUpdate => "PositionUpdate",
            Self::AccountInfo => "AccountInfo",
            Self::Error => "Error",
            Self::Disconnect => "Disconnect",
            Self::Custom => "Custom",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(MessageType::Unknown),
            1 => Ok(MessageType::Handshake),
            2 => Ok(MessageType::Heartbeat),
            3 => Ok(MessageType::MarketData),
            4 => Ok(MessageType::OrderRequest),
            5 => Ok(MessageType::OrderConfirmation),
            6 => Ok(MessageType::PositionUpdate),
            7 => Ok(MessageType::AccountInfo),
            8 => Ok(MessageType::Error),
            9 => Ok(MessageType::Disconnect),
            10 => Ok(MessageType::Custom),
            other => Err(CodecError::UnknownMessageType(other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value as u8
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
