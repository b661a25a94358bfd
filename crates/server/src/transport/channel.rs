//! Write side of one client channel
//!
//! The session's read loop owns the read half; the write half lives here,
//! behind an async mutex shared by the dispatcher and the session teardown.
//! Closing takes the same lock, so it waits for any in-flight write, and a
//! write after close fails with `ChannelClosed` without touching the stream.
//! Sends and closes both observe the server's cancellation token.

use bytes::Bytes;
use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tradebridge_core::SessionId;

use crate::error::TransportError;

type FrameSink = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, LengthDelimitedCodec>;

/// Framed writer for one attached client
pub struct ClientChannel {
    session_id: SessionId,
    /// `None` once closed
    sink: Mutex<Option<FrameSink>>,
}

impl ClientChannel {
    /// Wrap the write half of a client stream
    pub fn new<W>(session_id: SessionId, writer: W, codec: LengthDelimitedCodec) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        Self {
            session_id,
            sink: Mutex::new(Some(FramedWrite::new(writer, codec))),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Write one frame and flush it
    ///
    /// Waiting for the lock and the write itself both observe `cancel`.
    pub async fn send(&self, frame: Bytes, cancel: &CancellationToken) -> Result<(), TransportError> {
        let mut guard = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            guard = self.sink.lock() => guard,
        };
        let sink = guard.as_mut().ok_or(TransportError::ChannelClosed)?;

        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = sink.send(frame) => result.map_err(TransportError::from),
        }
    }

    /// Flush and shut down the write half. Idempotent.
    ///
    /// Once `cancel` fires the sink is dropped unflushed: a cancelled write
    /// may have left a partial frame that a stalled peer would never drain.
    pub async fn close(&self, cancel: &CancellationToken) -> Result<(), TransportError> {
        let sink = tokio::select! {
            _ = cancel.cancelled() => self.sink.lock().await.take(),
            mut guard = self.sink.lock() => guard.take(),
        };
        let Some(mut sink) = sink else {
            return Ok(());
        };
        if cancel.is_cancelled() {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            result = SinkExt::<Bytes>::close(&mut sink) => result.map_err(TransportError::from),
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.sink.lock().await.is_none()
    }
}

impl std::fmt::Debug for ClientChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientChannel")
            .field("session_id", &self.session_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::frame_codec;
    use futures_util::StreamExt;
    use tokio_util::codec::FramedRead;

    #[tokio::test]
    async fn test_send_writes_one_frame() {
        let (server, client) = tokio::io::duplex(1024);
        let channel = ClientChannel::new(SessionId::new(), server, frame_codec(1024));
        let mut reader = FramedRead::new(client, frame_codec(1024));

        let cancel = CancellationToken::new();
        channel
            .send(Bytes::from_static(b"hello"), &cancel)
            .await
            .unwrap();

        let frame = reader.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"hello");
    }

    #[tokio::test]
    async fn test_send_after_close_fails_safely() {
        let channel = ClientChannel::new(SessionId::new(), tokio::io::sink(), frame_codec(1024));
        let cancel = CancellationToken::new();

        channel.close(&cancel).await.unwrap();
        assert!(channel.is_closed().await);
        // Second close is a no-op
        channel.close(&cancel).await.unwrap();

        let result = channel.send(Bytes::from_static(b"late"), &cancel).await;
        assert!(matches!(result, Err(TransportError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_send_observes_cancellation() {
        // Tiny buffer with nobody reading: the write would block forever
        let (server, _client) = tokio::io::duplex(8);
        let channel = ClientChannel::new(SessionId::new(), server, frame_codec(1024));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = channel.send(Bytes::from(vec![0u8; 512]), &cancel).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let (server, client) = tokio::io::duplex(64);
        drop(client);
        let channel = ClientChannel::new(SessionId::new(), server, frame_codec(1024));

        let result = channel
            .send(Bytes::from_static(b"nobody home"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }

    #[tokio::test]
    async fn test_close_after_cancelled_write_does_not_block() {
        // Nobody reads the other end, so the frame stays half written
        let (server, _client) = tokio::io::duplex(8);
        let channel = ClientChannel::new(SessionId::new(), server, frame_codec(1024));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let result = channel.send(Bytes::from(vec![0u8; 512]), &cancel).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));

        tokio::time::timeout(std::time::Duration::from_secs(2), channel.close(&cancel))
            .await
            .expect("close blocked on a stalled peer")
            .unwrap();
        assert!(channel.is_closed().await);
    }

    #[tokio::test]
    async fn test_close_on_stalled_peer_yields_to_cancellation() {
        let (server, _client) = tokio::io::duplex(8);
        let channel = ClientChannel::new(SessionId::new(), server, frame_codec(1024));
        let cancel = CancellationToken::new();

        // Fill the pipe so the shutdown flush has to wait
        let pending = channel.send(Bytes::from(vec![0u8; 512]), &cancel);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), pending)
                .await
                .is_err()
        );

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });
        tokio::time::timeout(std::time::Duration::from_secs(2), channel.close(&cancel))
            .await
            .expect("close ignored cancellation")
            .unwrap();
    }
}
