//! Socket-backed runtime channel.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tokio::time::timeout;

use crate::runtime::{ChannelError, RuntimeChannel};

/// Where the runtime API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEndpoint {
    /// `unix:/var/run/haproxy.sock` or a bare path.
    Unix(PathBuf),
    /// `tcp:127.0.0.1:9999` (e.g. a socket relay).
    Tcp(String),
}

impl FromStr for SocketEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(addr) = s.strip_prefix("tcp:") {
            return match addr.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                    Ok(SocketEndpoint::Tcp(addr.to_string()))
                }
                _ => Err(format!("invalid tcp endpoint '{}'", s)),
            };
        }
        let path = s.strip_prefix("unix:").unwrap_or(s);
        if path.is_empty() {
            return Err("empty socket path".to_string());
        }
        Ok(SocketEndpoint::Unix(PathBuf::from(path)))
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketEndpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            SocketEndpoint::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

/// Opens a fresh connection for every command.
#[derive(Debug, Clone)]
pub struct SocketChannel {
    endpoint: SocketEndpoint,
    timeout: Duration,
}

impl SocketChannel {
    pub fn new(endpoint: SocketEndpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    async fn exchange(&self, command: &str) -> Result<String, ChannelError> {
        match &self.endpoint {
            SocketEndpoint::Unix(path) => {
                if !path.exists() {
                    return Err(ChannelError::Unavailable(format!(
                        "socket {} does not exist",
                        path.display()
                    )));
                }
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(|e| connect_error(&self.endpoint, e))?;
                roundtrip(stream, command).await
            }
            SocketEndpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| connect_error(&self.endpoint, e))?;
                roundtrip(stream, command).await
            }
        }
    }
}

#[async_trait]
impl RuntimeChannel for SocketChannel {
    async fn send(&self, command: &str) -> Result<String, ChannelError> {
        if command.contains(['\n', '\r']) {
            return Err(ChannelError::Protocol(
                "command must be a single line".to_string(),
            ));
        }

        match timeout(self.timeout, self.exchange(command)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(self.timeout)),
        }
    }

    fn is_present(&self) -> bool {
        match &self.endpoint {
            SocketEndpoint::Unix(path) => path.exists(),
            SocketEndpoint::Tcp(_) => true,
        }
    }
}

fn connect_error(endpoint: &SocketEndpoint, e: io::Error) -> ChannelError {
    ChannelError::Unavailable(format!("connect to {} failed: {}", endpoint, e))
}

/// Write one line, read until EOF or a blank-line terminator.
async fn roundtrip<S>(mut stream: S, command: &str) -> Result<String, ChannelError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let io_err = |e: io::Error| ChannelError::Protocol(format!("socket I/O failed: {}", e));

    stream
        .write_all(format!("{}\n", command).as_bytes())
        .await
        .map_err(io_err)?;
    stream.flush().await.map_err(io_err)?;

    let mut reply = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.map_err(io_err)?;
        if n == 0 {
            break;
        }
        reply.extend_from_slice(&chunk[..n]);
        if reply.ends_with(b"\n\n") {
            break;
        }
    }
    let _ = stream.shutdown().await;

    Ok(String::from_utf8_lossy(&reply).into_owned())
}
