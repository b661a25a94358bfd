//! TradeBridge Core Domain
//!
//! Pure domain types for the TradeBridge IPC bridge: the message envelope
//! exchanged with trading platforms, platform and message kinds, and the
//! per-client connection status tracked by the server.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod error;
pub mod values;
pub mod wire;

// Re-export commonly used types at crate root
pub use entities::{
    ConnectionStatus, MessageId, MessageType, SessionId, TradingMessage, TradingPlatform,
};
pub use error::CodecError;
pub use values::{Price, Symbol, Timestamp, Volume};
