mod connection_status;
mod message;
mod message_type;
mod platform;
mod session_id;

pub use connection_status::ConnectionStatus;
pub use message::{MessageId, TradingMessage};
pub use message_type::MessageType;
pub use platform::TradingPlatform;
pub use session_id::SessionId;
