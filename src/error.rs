//! Canonical error type for window operations.
//!
//! Every failure is local to one connection or one request. [`ErrorKind`]
//! groups the variants so callers and metrics can tell peer misbehaviour
//! from resource limits and API misuse.

use thiserror::Error;

use crate::{
    config::ConfigError,
    frame::FrameError,
    registry::ConnectionId,
    transport::SessionId,
};

/// Broad category of a [`WindowError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The peer violated the wire protocol or handshake.
    Protocol,
    /// A connection or queue limit was reached.
    Capacity,
    /// The window was configured or called incorrectly.
    Configuration,
}

impl ErrorKind {
    /// Short label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Capacity => "capacity",
            Self::Configuration => "configuration",
        }
    }
}

/// Errors returned by window event processing and sending.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// An inbound frame could not be decoded.
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),
    /// The window already serves its maximum number of connections.
    #[error("connection limit {limit} reached")]
    ConnectionLimit {
        /// Configured limit.
        limit: usize,
    },
    /// A ready event arrived for a session that already has a connection.
    #[error("connection for session {0} already exists")]
    DuplicateSession(SessionId),
    /// Data arrived for a session without a connection.
    #[error("data for session {0} without valid connection")]
    UnknownSession(SessionId),
    /// The client presented an unknown key to a native-only window.
    #[error("session {0} presented an unknown key")]
    UnauthorizedKey(SessionId),
    /// Application data arrived before the handshake completed.
    #[error("connection {connection} sent data on channel {channel} before handshake")]
    UnexpectedData {
        /// Offending connection.
        connection: ConnectionId,
        /// Channel the data arrived on.
        channel: u32,
    },
    /// The transport reported an event the window does not understand.
    #[error("unexpected websocket event {0:?}")]
    UnexpectedEvent(String),
    /// Outbound data was dropped for connections whose queue was full.
    #[error("maximum queue length {max} achieved for connections {dropped:?}")]
    QueueFull {
        /// Connections that did not receive the data.
        dropped: Vec<ConnectionId>,
        /// Configured queue length.
        max: usize,
    },
    /// No connection carries the given id.
    #[error("no connection {0}")]
    UnknownConnection(ConnectionId),
    /// The two windows are served by different managers.
    #[error("same web window manager should be used")]
    ForeignManager,
    /// Invalid or ill-timed configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WindowError {
    /// Category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Frame(_)
            | Self::DuplicateSession(_)
            | Self::UnknownSession(_)
            | Self::UnauthorizedKey(_)
            | Self::UnexpectedData { .. }
            | Self::UnexpectedEvent(_) => ErrorKind::Protocol,
            Self::ConnectionLimit { .. } | Self::QueueFull { .. } => ErrorKind::Capacity,
            Self::UnknownConnection(_) | Self::ForeignManager | Self::Config(_) => {
                ErrorKind::Configuration
            }
        }
    }
}

/// Result alias used by window operations.
pub type Result<T, E = WindowError> = std::result::Result<T, E>;
