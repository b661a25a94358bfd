use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MessageType, TradingPlatform};
use crate::error::CodecError;
use crate::values::{Price, Symbol, Timestamp, Volume};

/// Unique identifier for a message
pub type MessageId = Uuid;

/// Trading message exchanged between platforms and the bridge
///
/// Identifier and timestamp are assigned once, when the sender builds the
/// message; decoding restores them from the wire. Fields are read-only
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingMessage {
    message_id: MessageId,
    #[serde(with = "crate::wire::iso8601_millis")]
    timestamp: Timestamp,
    source: TradingPlatform,
    target: TradingPlatform,
    message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    symbol: Option<Symbol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    volume: Option<Volume>,
}

impl TradingMessage {
    /// Create a new message stamped with a fresh id and the current time
    pub fn new(source: TradingPlatform, target: TradingPlatform, message_type: MessageType) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now().trunc_subsecs(3),
            source,
            target,
            message_type,
            payload: None,
            symbol: None,
            price: None,
            volume: None,
        }
    }

    /// Handshake announcing `platform` under the display name `client_name`
    pub fn handshake(platform: TradingPlatform, client_name: impl Into<String>) -> Self {
        Self::new(platform, TradingPlatform::TradingBridge, MessageType::Handshake)
            .with_payload(client_name)
    }

    /// Keep-alive from `source` to `target`
    pub fn heartbeat(source: TradingPlatform, target: TradingPlatform) -> Self {
        Self::new(source, target, MessageType::Heartbeat)
    }

    /// Override the creation time (replay/testing)
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp.trunc_subsecs(3);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<Symbol>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn source(&self) -> TradingPlatform {
        self.source
    }

    pub fn target(&self) -> TradingPlatform {
        self.target
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn price(&self) -> Option<Price> {
        self.price
    }

    pub fn volume(&self) -> Option<Volume> {
        self.volume
    }

    pub fn is_handshake(&self) -> bool {
        self.message_type == MessageType::Handshake
    }

    /// Encode as UTF-8 JSON (one frame body)
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode one frame body
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
