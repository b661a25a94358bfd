//! Connection registry
//!
//! Concurrent table of live sessions: session id -> (write channel, status).
//! Backed by a sharded `DashMap`, so sessions on different shards never
//! contend. Every method takes and releases its shard lock before returning;
//! callers never hold a map guard across an await point.

use dashmap::DashMap;
use std::sync::Arc;
use tradebridge_core::{ConnectionStatus, SessionId, TradingPlatform};

use crate::transport::ClientChannel;

/// One registered session
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub channel: Arc<ClientChannel>,
    pub status: ConnectionStatus,
}

/// Thread-safe registry of connected clients
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted channel; returns its initial status
    pub fn register(&self, session_id: SessionId, channel: Arc<ClientChannel>) -> ConnectionStatus {
        let status = ConnectionStatus::new(session_id);
        self.sessions.insert(
            session_id,
            SessionEntry {
                channel,
                status: status.clone(),
            },
        );
        status
    }

    /// Apply a handshake to a session; returns the promoted status
    pub fn promote(
        &self,
        session_id: &SessionId,
        platform: TradingPlatform,
        client_name: impl Into<String>,
    ) -> Option<ConnectionStatus> {
        self.sessions.get_mut(session_id).map(|mut entry| {
            entry.status.promote(platform, client_name);
            entry.status.clone()
        })
    }

    /// Record activity on a session. Returns false if it is not registered.
    pub fn touch(&self, session_id: &SessionId) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                entry.status.touch();
                true
            }
            None => false,
        }
    }

    /// Clear the connected flag; returns the final status
    pub fn mark_disconnected(&self, session_id: &SessionId) -> Option<ConnectionStatus> {
        self.sessions.get_mut(session_id).map(|mut entry| {
            entry.status.is_connected = false;
            entry.status.clone()
        })
    }

    /// Detach a session, handing its entry to the caller for teardown
    pub fn remove(&self, session_id: &SessionId) -> Option<SessionEntry> {
        self.sessions.remove(session_id).map(|(_, entry)| entry)
    }

    /// Remove every session
    pub fn drain(&self) -> Vec<(SessionId, SessionEntry)> {
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .collect()
    }

    pub fn status(&self, session_id: &SessionId) -> Option<ConnectionStatus> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.status.clone())
    }

    pub fn channel(&self, session_id: &SessionId) -> Option<Arc<ClientChannel>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.channel.clone())
    }

    /// Point-in-time list of write channels
    pub fn channels(&self) -> Vec<(SessionId, Arc<ClientChannel>)> {
        self.sessions
            .iter()
            .map(|entry| (*entry.key(), entry.channel.clone()))
            .collect()
    }

    /// Point-in-time copy of every status, oldest connection first
    pub fn snapshot(&self) -> Vec<ConnectionStatus> {
        let mut statuses: Vec<ConnectionStatus> = self
            .sessions
            .iter()
            .map(|entry| entry.status.clone())
            .collect();
        statuses.sort_by(|a, b| {
            a.connected_since
                .cmp(&b.connected_since)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        statuses
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
