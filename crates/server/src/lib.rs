//! TradeBridge pipe server
//!
//! Local IPC hub for trading platform clients (MetaTrader 4/5,
//! NinjaTrader). Provides:
//! - Transport abstraction (Unix socket / Windows named pipe, in-memory)
//! - Connection registry of live sessions
//! - Per-client sessions with handshake-driven identity
//! - Broadcast and unicast dispatch
//! - Server events for observers
//!
//! ## Architecture
//!
//! ```text
//!   MT4 / MT5 / NinjaTrader clients
//!         │  length-prefixed JSON frames
//!    ┌────▼─────┐   spawn   ┌───────────────┐
//!    │ Listener ├──────────▶│ ClientSession │ x N
//!    └──────────┘           └──┬─────────┬──┘
//!                     register │         │ events
//!                    ┌─────────▼──┐   ┌──▼──────────┐
//!                    │  Registry  │   │ EventBus    │──▶ subscribers
//!                    └─────────▲──┘   └─────────────┘
//!                              │ channels
//!                      ┌───────┴────┐
//!     PipeServer ─────▶│ Dispatcher │──▶ broadcast / unicast
//!                      └────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! `PipeServer::start` spawns the listener; `PipeServer::stop` cancels every
//! task, waits for sessions to unwind and leaves the registry empty. A
//! stopped server can be started again.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod listener;
pub mod registry;
pub mod server;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use client::PipeClient;
pub use config::{ServerConfig, load_config, load_config_from_str, load_default_config};
pub use dispatcher::{DeliveryReport, Dispatcher};
pub use error::{ConfigError, TransportError};
pub use events::{EventPublisher, EventSubscriber, ServerEvent};
pub use registry::ConnectionRegistry;
pub use server::PipeServer;
pub use transport::{
    LocalSocketTransport, MemoryConnector, MemoryTransport, PipeListener, PipeTransport,
    memory_transport,
};
