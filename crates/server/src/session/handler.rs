//! Per-client read loop and teardown

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use tokio::io::ReadHalf;
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tradebridge_core::{ConnectionStatus, SessionId, TradingMessage};

use super::state::{SessionInput, SessionState};
use crate::events::EventPublisher;
use crate::registry::ConnectionRegistry;
use crate::transport::{ClientChannel, PipeStream, frame_codec};

/// Why the read loop stopped
#[derive(Debug)]
enum ExitReason {
    Cancelled,
    Disconnected,
    Failed(io::Error),
}

/// Owns one accepted channel from registration to release
pub struct ClientSession {
    id: SessionId,
    reader: FramedRead<ReadHalf<PipeStream>, LengthDelimitedCodec>,
    channel: Arc<ClientChannel>,
    registry: Arc<ConnectionRegistry>,
    events: EventPublisher,
    cancel: CancellationToken,
    state: SessionState,
    /// Last status seen, used if the registry entry is already gone at teardown
    last_status: ConnectionStatus,
}

impl ClientSession {
    /// Split `stream` into the session's reader and a shared write channel
    pub fn new(
        id: SessionId,
        stream: PipeStream,
        max_frame_length: usize,
        registry: Arc<ConnectionRegistry>,
        events: EventPublisher,
        cancel: CancellationToken,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            id,
            reader: FramedRead::new(read_half, frame_codec(max_frame_length)),
            channel: Arc::new(ClientChannel::new(
                id,
                write_half,
                frame_codec(max_frame_length),
            )),
            registry,
            events,
            cancel,
            state: SessionState::Connecting,
            last_status: ConnectionStatus::new(id),
        }
    }

    /// Register, read until the channel ends, then tear down
    pub async fn run(mut self) {
        self.last_status = self.registry.register(self.id, self.channel.clone());
        self.advance(SessionInput::Registered);
        debug!("Session {} active", self.id);

        match self.read_loop().await {
            ExitReason::Cancelled => {
                info!("Client handler cancelled: {}", self.id);
            }
            ExitReason::Disconnected => {
                debug!("Client {} closed the channel", self.id);
            }
            ExitReason::Failed(e) => {
                error!("Error handling client {}: {}", self.id, e);
                self.events
                    .error_occurred(format!("Client error: {}", e));
            }
        }

        self.teardown().await;
    }

    async fn read_loop(&mut self) -> ExitReason {
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return ExitReason::Cancelled,
                next = self.reader.next() => next,
            };

            match next {
                Some(Ok(frame)) => self.handle_frame(&frame),
                Some(Err(e)) if is_disconnect(&e) => return ExitReason::Disconnected,
                Some(Err(e)) => return ExitReason::Failed(e),
                None => return ExitReason::Disconnected,
            }
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        let message = match TradingMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "Dropping malformed frame from {} ({} bytes): {}",
                    self.id,
                    frame.len(),
                    e
                );
                return;
            }
        };

        debug!(
            "Received {} from {}: {}",
            message.message_type(),
            self.id,
            String::from_utf8_lossy(frame)
        );

        self.registry.touch(&self.id);

        if message.is_handshake() {
            self.advance(SessionInput::Handshake);
            let client_name = message
                .payload()
                .map(str::to_owned)
                .unwrap_or_else(|| self.id.to_string());

            if let Some(status) = self
                .registry
                .promote(&self.id, message.source(), client_name)
            {
                info!(
                    "Client {} identified as {} '{}'",
                    self.id, status.platform, status.client_name
                );
                self.last_status = status.clone();
                self.events.client_connected(status);
            }
        } else {
            self.advance(SessionInput::Frame);
        }

        self.events.message_received(message);
    }

    async fn teardown(&mut self) {
        self.advance(SessionInput::Terminate);

        let status = self
            .registry
            .mark_disconnected(&self.id)
            .unwrap_or_else(|| {
                let mut status = self.last_status.clone();
                status.is_connected = false;
                status
            });
        info!("Client disconnected: {} ({})", self.id, status.client_name);
        self.events.client_disconnected(status);

        self.registry.remove(&self.id);

        if let Err(e) = self.channel.close(&self.cancel).await {
            error!("Error closing pipe for client {}: {}", self.id, e);
            self.events
                .error_occurred(format!("Close error for {}: {}", self.id, e));
        }

        self.advance(SessionInput::Released);
    }

    fn advance(&mut self, input: SessionInput) {
        match self.state.next(input) {
            Ok(next) => self.state = next,
            Err(e) => warn!("Session {}: {}", self.id, e),
        }
    }
}

/// Errors that just mean the peer went away
fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}
