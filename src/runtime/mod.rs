//! Runtime administration channel subsystem.
//!
//! # Data Flow
//! ```text
//! Mutation
//!     → command.rs (typed RuntimeCommand, rendered as one line)
//!     → socket.rs (fresh Unix/TCP connection per call, bounded timeout)
//!     → reply text
//!     → send_checked (empty reply or error marker → Protocol error)
//!
//! show stat
//!     → stats.rs (CSV reply → ServerStat rows)
//! ```
//!
//! # Design Decisions
//! - One connection per command; the admin socket is request/response per line
//! - No shell or `socat` in between; the socket is spoken to directly
//! - The textual reply is loosely structured, so success means
//!   "non-empty and no line starts with an error marker"

pub mod command;
pub mod socket;
pub mod stats;

pub use command::RuntimeCommand;
pub use socket::{SocketChannel, SocketEndpoint};
pub use stats::{parse_stat_csv, ServerStat};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::observability::metrics;

/// Errors from the runtime channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Socket missing or connection refused.
    #[error("runtime socket unavailable: {0}")]
    Unavailable(String),

    /// No complete reply within the configured interval.
    #[error("runtime socket timed out after {0:?}")]
    Timeout(Duration),

    /// The proxy replied with an error, nothing, or garbage.
    #[error("runtime protocol error: {0}")]
    Protocol(String),
}

impl ChannelError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelError::Unavailable(_) => "unavailable",
            ChannelError::Timeout(_) => "timeout",
            ChannelError::Protocol(_) => "protocol",
        }
    }
}

/// A line-oriented channel to the proxy's runtime API.
#[async_trait]
pub trait RuntimeChannel: Send + Sync {
    /// Send one command line and return the raw reply.
    async fn send(&self, command: &str) -> Result<String, ChannelError>;

    /// Whether the channel endpoint looks reachable without sending anything.
    fn is_present(&self) -> bool {
        true
    }
}

/// Reply prefixes the proxy uses for failures (compared lowercase).
const ERROR_MARKERS: &[&str] = &[
    "[alert]",
    "unknown command",
    "no such",
    "require",
    "permission denied",
    "already exists",
    "only servers",
    "this command",
    "backend must",
    "unable",
    "invalid",
    "error",
];

/// First reply line that starts with an error marker, if any.
pub fn find_error_line(reply: &str) -> Option<&str> {
    reply.lines().map(str::trim).find(|line| {
        let lower = line.to_ascii_lowercase();
        ERROR_MARKERS.iter().any(|marker| lower.starts_with(marker))
    })
}

/// Send a typed command and treat error markers as failures.
pub async fn send_checked(
    channel: &dyn RuntimeChannel,
    command: &RuntimeCommand,
) -> Result<String, ChannelError> {
    let line = command.to_string();
    tracing::debug!(command = %line, "Sending runtime command");

    let result = match channel.send(&line).await {
        Ok(reply) if reply.trim().is_empty() => {
            Err(ChannelError::Protocol("empty reply".to_string()))
        }
        Ok(reply) => match find_error_line(&reply) {
            Some(error_line) => Err(ChannelError::Protocol(error_line.to_string())),
            None => Ok(reply),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        metrics::record_runtime_error(e.kind());
    }
    result
}
