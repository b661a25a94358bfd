//! Machine-local transport
//!
//! Unix: a Unix domain socket at `<socket_dir>/<pipe_name>.sock`; one bound
//! listener accepts every client. Windows: the named pipe
//! `\\.\pipe\<pipe_name>`, with a fresh pipe instance created for each
//! client so any number of clients can attach under the same name.

use async_trait::async_trait;
use log::{debug, warn};
use std::io;
use std::path::PathBuf;

use super::{PipeListener, PipeStream, PipeTransport};
use crate::config::ServerConfig;

/// Local IPC transport for the current platform
#[derive(Debug, Clone)]
pub struct LocalSocketTransport {
    #[cfg_attr(windows, allow(dead_code))]
    socket_dir: PathBuf,
}

impl LocalSocketTransport {
    /// Create a transport placing sockets in `socket_dir`
    pub fn new(socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            socket_dir: socket_dir.into(),
        }
    }

    /// Create from server config (socket dir defaults to the OS temp dir)
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.socket_dir.clone().unwrap_or_else(std::env::temp_dir))
    }

    /// Filesystem path of the Unix socket for `pipe_name`
    #[cfg(unix)]
    pub fn socket_path(&self, pipe_name: &str) -> PathBuf {
        self.socket_dir.join(format!("{}.sock", pipe_name))
    }

    /// Named pipe address for `pipe_name`
    #[cfg(windows)]
    pub fn pipe_address(&self, pipe_name: &str) -> String {
        format!(r"\\.\pipe\{}", pipe_name)
    }

    /// Attach to a server as a client
    #[cfg(unix)]
    pub async fn connect(&self, pipe_name: &str) -> io::Result<PipeStream> {
        let stream = tokio::net::UnixStream::connect(self.socket_path(pipe_name)).await?;
        Ok(Box::new(stream))
    }

    /// Attach to a server as a client
    #[cfg(windows)]
    pub async fn connect(&self, pipe_name: &str) -> io::Result<PipeStream> {
        use tokio::net::windows::named_pipe::ClientOptions;
        use tokio::time::{Duration, sleep};

        // ERROR_PIPE_BUSY: every instance is taken, the server creates a new one shortly
        const ERROR_PIPE_BUSY: i32 = 231;

        let address = self.pipe_address(pipe_name);
        loop {
            match ClientOptions::new().open(&address) {
                Ok(client) => return Ok(Box::new(client)),
                Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => {
                    sleep(Duration::from_millis(20)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for LocalSocketTransport {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

#[cfg(unix)]
impl PipeTransport for LocalSocketTransport {
    fn listen(&self, pipe_name: &str) -> io::Result<Box<dyn PipeListener>> {
        let path = self.socket_path(pipe_name);
        // A socket file left behind by a previous run blocks bind
        match std::fs::remove_file(&path) {
            Ok(()) => warn!("Removed stale socket file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let listener = tokio::net::UnixListener::bind(&path)?;
        debug!("Bound Unix socket {}", path.display());
        Ok(Box::new(UnixPipeListener { listener, path }))
    }

    fn describe(&self, pipe_name: &str) -> String {
        self.socket_path(pipe_name).display().to_string()
    }
}

#[cfg(unix)]
struct UnixPipeListener {
    listener: tokio::net::UnixListener,
    path: PathBuf,
}

#[cfg(unix)]
#[async_trait]
impl PipeListener for UnixPipeListener {
    async fn accept(&mut self) -> io::Result<PipeStream> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(Box::new(stream))
    }
}

#[cfg(unix)]
impl Drop for UnixPipeListener {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove socket file {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(windows)]
impl PipeTransport for LocalSocketTransport {
    fn listen(&self, pipe_name: &str) -> io::Result<Box<dyn PipeListener>> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let address = self.pipe_address(pipe_name);
        let next = ServerOptions::new()
            .first_pipe_instance(true)
            .create(&address)?;
        debug!("Created named pipe {}", address);
        Ok(Box::new(NamedPipeListener { address, next }))
    }

    fn describe(&self, pipe_name: &str) -> String {
        self.pipe_address(pipe_name)
    }
}

#[cfg(windows)]
struct NamedPipeListener {
    address: String,
    /// Instance waiting for the next client
    next: tokio::net::windows::named_pipe::NamedPipeServer,
}

#[cfg(windows)]
#[async_trait]
impl PipeListener for NamedPipeListener {
    async fn accept(&mut self) -> io::Result<PipeStream> {
        use tokio::net::windows::named_pipe::ServerOptions;

        self.next.connect().await?;
        // Publish the next instance before handing this one out so the name
        // never disappears between clients
        let fresh = ServerOptions::new().create(&self.address)?;
        let connected = std::mem::replace(&mut self.next, fresh);
        Ok(Box::new(connected))
    }
}
