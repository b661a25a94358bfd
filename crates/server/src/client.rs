//! Framed pipe client
//!
//! Speaks the server's wire format over any byte stream. Used by the
//! integration tests and by tooling that needs to act as a platform client.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tradebridge_core::TradingMessage;

use crate::config::ServerConfig;
use crate::error::TransportError;
use crate::transport::{LocalSocketTransport, PipeIo, PipeStream, frame_codec};

pub struct PipeClient {
    framed: Framed<PipeStream, LengthDelimitedCodec>,
}

impl PipeClient {
    /// Wrap an already connected stream
    pub fn from_stream<S: PipeIo>(stream: S, max_frame_length: usize) -> Self {
        let stream: PipeStream = Box::new(stream);
        Self {
            framed: Framed::new(stream, frame_codec(max_frame_length)),
        }
    }

    /// Attach to a server on the local transport described by `config`
    pub async fn connect(config: &ServerConfig) -> Result<Self, TransportError> {
        let transport = LocalSocketTransport::from_config(config);
        let stream = transport.connect(&config.pipe_name).await?;
        debug!("Connected to {}", config.pipe_name);
        Ok(Self {
            framed: Framed::new(stream, frame_codec(config.max_frame_length)),
        })
    }

    pub async fn send(&mut self, message: &TradingMessage) -> Result<(), TransportError> {
        let frame = Bytes::from(message.encode()?);
        self.send_raw(frame).await
    }

    /// Write an arbitrary frame body, valid envelope or not
    pub async fn send_raw(&mut self, frame: impl Into<Bytes>) -> Result<(), TransportError> {
        let frame: Bytes = frame.into();
        self.framed.send(frame).await?;
        Ok(())
    }

    /// Next message from the server; `None` once the server hung up
    pub async fn recv(&mut self) -> Option<Result<TradingMessage, TransportError>> {
        let frame = match self.framed.next().await? {
            Ok(frame) => frame,
            Err(e) => return Some(Err(e.into())),
        };
        Some(TradingMessage::decode(&frame).map_err(TransportError::from))
    }

    /// Flush and shut down the write side
    pub async fn close(mut self) -> Result<(), TransportError> {
        SinkExt::<Bytes>::flush(&mut self.framed).await?;
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }
}
