//! Pipe server facade
//!
//! Owns the lifecycle (`Stopped -> Running -> Stopped`, restartable) and the
//! control surface observers use: start, stop, send, connected clients and
//! the event stream. Nothing here returns an error; failures inside the
//! accept loop or a session surface as `ServerEvent::ErrorOccurred`.

use log::{error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tradebridge_core::{ConnectionStatus, SessionId, TradingMessage};

use crate::config::ServerConfig;
use crate::dispatcher::{DeliveryReport, Dispatcher};
use crate::events::{EventPublisher, EventSubscriber};
use crate::listener::Listener;
use crate::registry::ConnectionRegistry;
use crate::session::SessionSupervisor;
use crate::transport::{LocalSocketTransport, PipeTransport};

/// Resources of one start/stop cycle
struct ServerRun {
    cancel: CancellationToken,
    listener: JoinHandle<()>,
    supervisor: SessionSupervisor,
}

/// IPC server accepting trading platform clients under one pipe name
pub struct PipeServer {
    config: ServerConfig,
    transport: Arc<dyn PipeTransport>,
    registry: Arc<ConnectionRegistry>,
    events: EventPublisher,
    dispatcher: Dispatcher,
    running: AtomicBool,
    run: Mutex<Option<ServerRun>>,
}

impl PipeServer {
    pub fn new(config: ServerConfig, transport: Arc<dyn PipeTransport>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let events = EventPublisher::new(config.event_capacity);
        let dispatcher = Dispatcher::new(registry.clone(), events.clone());

        Self {
            config,
            transport,
            registry,
            events,
            dispatcher,
            running: AtomicBool::new(false),
            run: Mutex::new(None),
        }
    }

    /// Server on the platform's local transport
    /// (Unix domain socket or Windows named pipe)
    pub fn local(config: ServerConfig) -> Self {
        let transport = Arc::new(LocalSocketTransport::from_config(&config));
        Self::new(config, transport)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn pipe_name(&self) -> &str {
        &self.config.pipe_name
    }

    /// Snapshot of every registered client, oldest connection first
    pub fn connected_clients(&self) -> Vec<ConnectionStatus> {
        self.registry.snapshot()
    }

    /// Subscribe to server events raised from now on
    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    /// Start accepting clients. Returns once the listener is spawned.
    pub async fn start(&self) {
        let mut run = self.run.lock().await;
        if run.is_some() {
            warn!("Server is already running");
            return;
        }

        let cancel = CancellationToken::new();
        let supervisor = SessionSupervisor::new();
        let listener = Listener::new(
            self.config.pipe_name.clone(),
            self.transport.clone(),
            self.registry.clone(),
            self.events.clone(),
            supervisor.clone(),
            cancel.clone(),
            self.config.max_frame_length,
            self.config.accept_retry_delay(),
        );

        self.running.store(true, Ordering::SeqCst);
        *run = Some(ServerRun {
            cancel,
            listener: tokio::spawn(listener.run()),
            supervisor,
        });
        info!(
            "Pipe server started on {}",
            self.transport.describe(&self.config.pipe_name)
        );
    }

    /// Stop accepting, end every session and wait for them to unwind
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(current) = run.take() else {
            warn!("Server is not running");
            return;
        };

        self.running.store(false, Ordering::SeqCst);
        current.cancel.cancel();

        if let Err(e) = current.listener.await {
            error!("Listener task failed: {}", e);
        }
        current.supervisor.join_all().await;

        // Sessions remove themselves; anything left here lost its task
        for (session_id, entry) in self.registry.drain() {
            warn!("Closing orphaned session {}", session_id);
            if let Err(e) = entry.channel.close(&current.cancel).await {
                error!("Error closing pipe for client {}: {}", session_id, e);
                self.events
                    .error_occurred(format!("Close error for {}: {}", session_id, e));
            }
        }

        info!("Pipe server stopped");
    }

    /// Broadcast `message` to every connected client
    pub async fn send_message(&self, message: &TradingMessage) -> DeliveryReport {
        let Some(cancel) = self.current_token().await else {
            warn!("Cannot send message: server is not running");
            return DeliveryReport::default();
        };
        self.dispatcher.broadcast(message, &cancel).await
    }

    /// Send `message` to one client. Returns true if it was written.
    pub async fn send_message_to_client(
        &self,
        message: &TradingMessage,
        session_id: &SessionId,
    ) -> bool {
        let Some(cancel) = self.current_token().await else {
            warn!("Cannot send message: server is not running");
            return false;
        };
        self.dispatcher.unicast(message, session_id, &cancel).await
    }

    /// Token of the current run. The lock is released before any write.
    async fn current_token(&self) -> Option<CancellationToken> {
        self.run.lock().await.as_ref().map(|run| run.cancel.clone())
    }
}

impl Drop for PipeServer {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().take() {
            run.cancel.cancel();
            run.listener.abort();
        }
    }
}
