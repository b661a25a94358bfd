//! Transport abstraction layer
//!
//! A transport publishes one logical pipe name and hands out one byte
//! stream per attached client. Message boundaries are added on top by a
//! length-prefix codec, so any reliable byte stream works:
//!
//! - **Local** (default): Unix domain socket on Unix, named pipe on Windows
//! - **Memory**: in-process duplex streams for embedding and tests

pub mod channel;
pub mod local;
pub mod memory;

pub use channel::ClientChannel;
pub use local::LocalSocketTransport;
pub use memory::{MemoryConnector, MemoryTransport, memory_transport};

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::LengthDelimitedCodec;

/// Byte stream of one attached client
pub trait PipeIo: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> PipeIo for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Boxed client stream for dynamic dispatch
pub type PipeStream = Box<dyn PipeIo>;

/// Listening endpoint - yields one stream per attached client
#[async_trait]
pub trait PipeListener: Send {
    /// Wait until exactly one client attaches
    async fn accept(&mut self) -> io::Result<PipeStream>;
}

/// Factory for listening endpoints under a logical pipe name
pub trait PipeTransport: Send + Sync {
    /// Open the listening endpoint for `pipe_name`
    fn listen(&self, pipe_name: &str) -> io::Result<Box<dyn PipeListener>>;

    /// Human-readable address of the endpoint (for logs)
    fn describe(&self, pipe_name: &str) -> String {
        pipe_name.to_string()
    }
}

/// Frame codec: 4-byte big-endian length prefix followed by the body
pub fn frame_codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec()
}
