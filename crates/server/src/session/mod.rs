//! Client sessions
//!
//! One session per accepted channel: a read loop that decodes frames,
//! promotes the connection on handshake and raises events, plus a
//! supervisor that owns the session tasks so shutdown can wait for them.

mod handler;
mod state;
mod supervisor;

pub use handler::ClientSession;
pub use state::{Identity, InvalidTransition, SessionInput, SessionState};
pub use supervisor::SessionSupervisor;
