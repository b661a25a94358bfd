use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{SessionId, TradingPlatform};
use crate::values::Timestamp;

/// Connection status of one attached client
///
/// Starts anonymous (`Unknown` platform, display name = session id) and is
/// promoted in place when the client sends a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Server-assigned session, stable for the life of the channel
    pub session_id: SessionId,
    pub platform: TradingPlatform,
    pub is_connected: bool,
    pub connected_since: Timestamp,
    /// Display name, replaced by the handshake payload when one is sent
    pub client_name: String,
    /// Time of the last successfully decoded message
    pub last_activity: Timestamp,
}

impl ConnectionStatus {
    /// Create a status for a freshly accepted channel with explicit timestamp
    pub fn new_with_time(session_id: SessionId, timestamp: Timestamp) -> Self {
        Self {
            session_id,
            platform: TradingPlatform::Unknown,
            is_connected: true,
            connected_since: timestamp,
            client_name: session_id.to_string(),
            last_activity: timestamp,
        }
    }

    /// Create a status for a freshly accepted channel using current time
    pub fn new(session_id: SessionId) -> Self {
        Self::new_with_time(session_id, Utc::now())
    }

    /// Apply a handshake: reveal platform and display name
    pub fn promote(&mut self, platform: TradingPlatform, client_name: impl Into<String>) {
        self.platform = platform;
        self.client_name = client_name.into();
    }

    /// Record activity at the given time
    pub fn touch_at(&mut self, timestamp: Timestamp) {
        self.last_activity = timestamp;
    }

    /// Record activity now
    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    /// Returns true once a handshake revealed the platform
    pub fn is_identified(&self) -> bool {
        self.platform.is_known()
    }
}
