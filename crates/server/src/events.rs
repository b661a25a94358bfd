//! Server events
//!
//! Lifecycle and message notifications fan out over a tokio broadcast
//! channel. Each subscriber owns a bounded queue: publishing never waits on
//! an observer, and an observer that falls more than `capacity` events behind
//! skips the oldest ones instead of stalling the server.
//! Unsubscribing is dropping the subscriber.

use log::warn;
use tokio::sync::broadcast;
use tradebridge_core::{ConnectionStatus, TradingMessage};

/// Notification raised by the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A frame from a client decoded successfully (handshakes included)
    MessageReceived(TradingMessage),
    /// A client revealed its identity with a handshake
    ClientConnected(ConnectionStatus),
    /// A session ended; carries its final status
    ClientDisconnected(ConnectionStatus),
    /// A non-fatal failure, described for operators
    ErrorOccurred(String),
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::MessageReceived(_) => "MessageReceived",
            ServerEvent::ClientConnected(_) => "ClientConnected",
            ServerEvent::ClientDisconnected(_) => "ClientDisconnected",
            ServerEvent::ErrorOccurred(_) => "ErrorOccurred",
        }
    }
}

/// Publishing side, cloned into every task that raises events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventPublisher {
    /// Create a publisher whose subscribers buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get a new subscriber; it sees events published from now on
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, event: ServerEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn message_received(&self, message: TradingMessage) {
        self.publish(ServerEvent::MessageReceived(message));
    }

    pub fn client_connected(&self, status: ConnectionStatus) {
        self.publish(ServerEvent::ClientConnected(status));
    }

    pub fn client_disconnected(&self, status: ConnectionStatus) {
        self.publish(ServerEvent::ClientDisconnected(status));
    }

    pub fn error_occurred(&self, description: impl Into<String>) {
        self.publish(ServerEvent::ErrorOccurred(description.into()));
    }
}

/// Receiving side of the event stream
pub struct EventSubscriber {
    rx: broadcast::Receiver<ServerEvent>,
}

impl EventSubscriber {
    /// Wait for the next event. `None` once the server is gone.
    pub async fn next(&mut self) -> Option<ServerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next queued event without waiting
    pub fn try_next(&mut self) -> Option<ServerEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything queued right now
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
