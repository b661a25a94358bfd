//! Session state machine
//!
//! ```text
//!             Registered          Terminate          Released
//! Connecting ───────────▶ Active ───────────▶ Closing ─────────▶ Closed
//!                          │  ▲
//!                          └──┘ Frame / Handshake
//!                     (Anonymous ──Handshake──▶ Identified)
//! ```

use thiserror::Error;

/// Whether a handshake revealed the client's platform yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Identified,
}

/// Lifecycle state of one client session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not yet registered
    Connecting,
    /// Registered and reading frames
    Active(Identity),
    /// Read loop ended, tearing down
    Closing,
    /// Channel released (terminal)
    Closed,
}

/// Inputs driving the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    Registered,
    /// A decoded non-handshake message
    Frame,
    Handshake,
    /// Cancellation, disconnect or I/O failure
    Terminate,
    Released,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid session transition: {input:?} in state {state:?}")]
pub struct InvalidTransition {
    pub state: SessionState,
    pub input: SessionInput,
}

impl SessionState {
    /// Transition table
    pub fn next(self, input: SessionInput) -> Result<SessionState, InvalidTransition> {
        match (self, input) {
            (SessionState::Connecting, SessionInput::Registered) => {
                Ok(SessionState::Active(Identity::Anonymous))
            }
            (SessionState::Active(identity), SessionInput::Frame) => {
                Ok(SessionState::Active(identity))
            }
            (SessionState::Active(_), SessionInput::Handshake) => {
                Ok(SessionState::Active(Identity::Identified))
            }
            (SessionState::Connecting | SessionState::Active(_), SessionInput::Terminate) => {
                Ok(SessionState::Closing)
            }
            (SessionState::Closing, SessionInput::Released) => Ok(SessionState::Closed),
            (state, input) => Err(InvalidTransition { state, input }),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, SessionState::Active(Identity::Identified))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}
