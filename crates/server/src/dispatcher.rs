//! Outbound message routing
//!
//! Broadcast writes the message to every registered channel concurrently;
//! unicast writes it to one session. A failed write is reported and never
//! affects delivery to other clients.

use bytes::Bytes;
use futures_util::future::join_all;
use log::{debug, error, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tradebridge_core::{SessionId, TradingMessage};

use crate::error::TransportError;
use crate::events::EventPublisher;
use crate::registry::ConnectionRegistry;
use crate::transport::ClientChannel;

/// Outcome of one delivery attempt across clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed + self.cancelled
    }
}

/// Routes outbound messages to registered client channels
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    events: EventPublisher,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, events: EventPublisher) -> Self {
        Self { registry, events }
    }

    /// Send `message` to every client registered right now
    pub async fn broadcast(
        &self,
        message: &TradingMessage,
        cancel: &CancellationToken,
    ) -> DeliveryReport {
        let channels = self.registry.channels();
        debug!(
            "Broadcasting {} to {} clients",
            message.message_type(),
            channels.len()
        );

        let results = join_all(
            channels
                .iter()
                .map(|(_, channel)| self.deliver(channel, message, cancel)),
        )
        .await;

        results
            .into_iter()
            .fold(DeliveryReport::default(), |mut report, outcome| {
                match outcome {
                    Delivery::Sent => report.delivered += 1,
                    Delivery::Failed => report.failed += 1,
                    Delivery::Cancelled => report.cancelled += 1,
                }
                report
            })
    }

    /// Send `message` to one session. Returns true if it was written.
    pub async fn unicast(
        &self,
        message: &TradingMessage,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> bool {
        let Some(channel) = self.registry.channel(session_id) else {
            warn!("Client {} not found", session_id);
            self.events
                .error_occurred(format!("Client {} not found", session_id));
            return false;
        };

        matches!(self.deliver(&channel, message, cancel).await, Delivery::Sent)
    }

    async fn deliver(
        &self,
        channel: &Arc<ClientChannel>,
        message: &TradingMessage,
        cancel: &CancellationToken,
    ) -> Delivery {
        let session_id = channel.session_id();
        match self.write(channel, message, cancel).await {
            Ok(()) => Delivery::Sent,
            Err(TransportError::Cancelled) => {
                debug!("Send to {} cancelled", session_id);
                Delivery::Cancelled
            }
            Err(e) => {
                error!("Error sending to client {}: {}", session_id, e);
                self.events
                    .error_occurred(format!("Send error to {}: {}", session_id, e));
                Delivery::Failed
            }
        }
    }

    /// Encode into a fresh buffer and write it to one channel
    async fn write(
        &self,
        channel: &ClientChannel,
        message: &TradingMessage,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let frame = Bytes::from(message.encode()?);
        channel.send(frame, cancel).await
    }
}

enum Delivery {
    Sent,
    Failed,
    Cancelled,
}
