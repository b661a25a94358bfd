//! Accept loop
//!
//! Keeps one listening endpoint open under the configured pipe name and
//! hands every attached client to a new session task. An accept failure is
//! reported, the endpoint is dropped, and a fresh one is opened after a
//! short back-off. The loop ends only on cancellation.

use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tradebridge_core::SessionId;

use crate::events::EventPublisher;
use crate::registry::ConnectionRegistry;
use crate::session::{ClientSession, SessionSupervisor};
use crate::transport::{PipeListener, PipeTransport};

pub struct Listener {
    pipe_name: String,
    transport: Arc<dyn PipeTransport>,
    registry: Arc<ConnectionRegistry>,
    events: EventPublisher,
    supervisor: SessionSupervisor,
    cancel: CancellationToken,
    max_frame_length: usize,
    retry_delay: Duration,
}

impl Listener {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pipe_name: impl Into<String>,
        transport: Arc<dyn PipeTransport>,
        registry: Arc<ConnectionRegistry>,
        events: EventPublisher,
        supervisor: SessionSupervisor,
        cancel: CancellationToken,
        max_frame_length: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            pipe_name: pipe_name.into(),
            transport,
            registry,
            events,
            supervisor,
            cancel,
            max_frame_length,
            retry_delay,
        }
    }

    /// Run until cancelled
    pub async fn run(self) {
        let address = self.transport.describe(&self.pipe_name);
        info!("Listening on {}", address);

        let mut endpoint: Option<Box<dyn PipeListener>> = None;

        while !self.cancel.is_cancelled() {
            if endpoint.is_none() {
                match self.transport.listen(&self.pipe_name) {
                    Ok(listener) => {
                        debug!("Opened endpoint {}", address);
                        endpoint = Some(listener);
                    }
                    Err(e) => {
                        error!("Failed to open {}: {}", address, e);
                        self.events
                            .error_occurred(format!("Connection error: {}", e));
                        self.back_off().await;
                        continue;
                    }
                }
            }

            let Some(listener) = endpoint.as_mut() else {
                continue;
            };

            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok(stream) => {
                    let session_id = SessionId::new();
                    info!("Client connected: {}", session_id);

                    let session = ClientSession::new(
                        session_id,
                        stream,
                        self.max_frame_length,
                        self.registry.clone(),
                        self.events.clone(),
                        self.cancel.child_token(),
                    );
                    self.supervisor.spawn(session.run());
                }
                Err(e) => {
                    error!("Error accepting connection on {}: {}", address, e);
                    self.events
                        .error_occurred(format!("Connection error: {}", e));
                    endpoint = None;
                    self.back_off().await;
                }
            }
        }

        info!("Listener on {} stopped", address);
    }

    async fn back_off(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.retry_delay) => {}
        }
    }
}
