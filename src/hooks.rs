//! Callbacks through which received data reaches the application.
//!
//! A window carries one [`DataCallback`] for channel 1 and lifecycle
//! notifications; individual connections may register another for channels
//! above 1. Callbacks run after the window's lock is released, so they may
//! call back into the window, for example to reply.

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    registry::ConnectionId,
    transport::{ProcessId, WindowManager},
};

/// Delivered to the data callback once a connection completes its handshake.
pub const CONN_READY: &str = "CONN_READY";

/// Delivered to the data callback when a connection goes away.
pub const CONN_CLOSED: &str = "CONN_CLOSED";

/// Receiver of connection data: `(connection, payload)`.
pub type DataCallback = Arc<dyn Fn(ConnectionId, &[u8]) + Send + Sync + 'static>;

/// Per-connection receiver of data on channels above 1.
pub type ChannelCallback = DataCallback;

/// Side effect collected while the window state is locked and applied after
/// the lock is released, in collection order.
pub(crate) enum Effect {
    /// Invoke a callback with a payload.
    Notify {
        callback: DataCallback,
        connection: ConnectionId,
        payload: Bytes,
    },
    /// Ask the manager to terminate a client process.
    Halt(ProcessId),
}

impl Effect {
    pub(crate) fn notify(callback: &DataCallback, connection: ConnectionId, payload: Bytes) -> Self {
        Self::Notify {
            callback: Arc::clone(callback),
            connection,
            payload,
        }
    }

    pub(crate) fn apply(self, manager: &dyn WindowManager) {
        match self {
            Self::Notify {
                callback,
                connection,
                payload,
            } => callback(connection, &payload),
            Self::Halt(process) => manager.halt_client(process),
        }
    }
}
