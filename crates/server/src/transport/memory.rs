//! In-process transport over tokio duplex streams
//!
//! `MemoryConnector::connect` plays the client side: it hands one end of a
//! fresh duplex pipe to the caller and queues the other end for the
//! server's next `accept`. No serialization shortcuts are taken, frames go
//! through the same codec as the local socket transport.

use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use tokio::io::DuplexStream;
use tokio::sync::{Mutex, mpsc};

use super::{PipeListener, PipeStream, PipeTransport};

type Incoming = io::Result<DuplexStream>;

/// Server side of the in-process transport
#[derive(Clone)]
pub struct MemoryTransport {
    incoming: Arc<Mutex<mpsc::UnboundedReceiver<Incoming>>>,
}

/// Client side of the in-process transport
#[derive(Clone)]
pub struct MemoryConnector {
    tx: mpsc::UnboundedSender<Incoming>,
    buffer_size: usize,
}

/// Create a connected transport/connector pair
///
/// `buffer_size` is the per-direction byte capacity of each client stream.
pub fn memory_transport(buffer_size: usize) -> (MemoryTransport, MemoryConnector) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            incoming: Arc::new(Mutex::new(rx)),
        },
        MemoryConnector { tx, buffer_size },
    )
}

impl MemoryConnector {
    /// Attach a new client; returns the client's end of the stream
    pub fn connect(&self) -> io::Result<DuplexStream> {
        let (client, server) = tokio::io::duplex(self.buffer_size);
        self.tx
            .send(Ok(server))
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "transport dropped"))?;
        Ok(client)
    }

    /// Make the server's next `accept` fail with `error`
    ///
    /// Lets callers exercise the listener's error path.
    pub fn fail_next_accept(&self, error: io::Error) -> io::Result<()> {
        self.tx
            .send(Err(error))
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "transport dropped"))
    }
}

impl PipeTransport for MemoryTransport {
    fn listen(&self, _pipe_name: &str) -> io::Result<Box<dyn PipeListener>> {
        Ok(Box::new(MemoryListener {
            incoming: self.incoming.clone(),
        }))
    }

    fn describe(&self, pipe_name: &str) -> String {
        format!("memory://{}", pipe_name)
    }
}

struct MemoryListener {
    incoming: Arc<Mutex<mpsc::UnboundedReceiver<Incoming>>>,
}

#[async_trait]
impl PipeListener for MemoryListener {
    async fn accept(&mut self) -> io::Result<PipeStream> {
        let mut incoming = self.incoming.lock().await;
        match incoming.recv().await {
            Some(Ok(stream)) => Ok(Box::new(stream)),
            Some(Err(e)) => Err(e),
            // Every connector is gone: no client can ever attach again
            None => std::future::pending().await,
        }
    }
}
