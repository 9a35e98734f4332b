//! Collaborators the window talks to.
//!
//! [`Transport`] hands finished frames to whatever owns the sockets, and
//! [`WindowManager`] performs the process and display management that lives
//! outside the protocol engine. [`ChannelTransport`] is a ready-made
//! transport forwarding frames over a tokio channel.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

numeric_id! {
    /// Opaque identifier the transport assigns to a websocket session.
    ///
    /// Zero is reserved for transport-level requests not tied to a session.
    SessionId(u64)
}

numeric_id! {
    /// Handle of an external client process known to the window manager.
    ProcessId(u64)
}

numeric_id! {
    /// Unique identifier of a window.
    WindowId(u32)
}

/// Non-blocking sink for outbound frames.
///
/// Implementations must not block: delivery success or failure is the
/// transport's concern.
pub trait Transport: Send + Sync + 'static {
    /// Send a complete text frame. `frame` is valid UTF-8.
    fn send_text(&self, session: SessionId, frame: Bytes);

    /// Send a binary payload preceded by its text `header`.
    fn send_binary(&self, session: SessionId, header: Bytes, data: Bytes);
}

/// Manager owning the window's surroundings: client processes, the HTTP
/// server and the application event loop.
pub trait WindowManager: Send + Sync + 'static {
    /// Terminate the client process identified by `process`.
    fn halt_client(&self, process: ProcessId);

    /// Forget a window that is being destroyed.
    fn unregister(&self, window: WindowId);

    /// Return the URL under which `window` is reachable.
    fn url(&self, window: WindowId, remote: bool) -> String;

    /// Display `window` at `location`, returning whether it was shown.
    fn show(&self, window: WindowId, location: &str) -> bool;

    /// Run the application loop until `check` returns non-zero or
    /// `time_limit` seconds pass. `check` receives the time spent so far.
    fn wait_for(&self, check: &mut dyn FnMut(f64) -> i32, time_limit: f64) -> i32;
}

/// Frame handed to a [`ChannelTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Text frame.
    Text {
        /// Destination session.
        session: SessionId,
        /// Encoded frame.
        frame: Bytes,
    },
    /// Binary frame.
    Binary {
        /// Destination session.
        session: SessionId,
        /// Text header ending in the binary marker.
        header: Bytes,
        /// Raw payload.
        data: Bytes,
    },
}

impl Outbound {
    /// Destination session of the frame.
    #[must_use]
    pub fn session(&self) -> SessionId {
        match self {
            Self::Text { session, .. } | Self::Binary { session, .. } => *session,
        }
    }

    /// Text part of the frame: the whole frame or the binary header.
    #[must_use]
    pub fn text(&self) -> &[u8] {
        match self {
            Self::Text { frame, .. } => frame,
            Self::Binary { header, .. } => header,
        }
    }
}

/// [`Transport`] forwarding frames into an unbounded tokio channel.
///
/// The receiving half is typically drained by the task writing to the
/// socket. Frames sent after the receiver is dropped are discarded.
#[derive(Clone, Debug)]
pub struct ChannelTransport(mpsc::UnboundedSender<Outbound>);

impl ChannelTransport {
    /// Create a transport and the receiver yielding its frames.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    fn forward(&self, frame: Outbound) {
        if let Err(err) = self.0.send(frame) {
            debug!(session = %err.0.session(), "transport receiver dropped; frame discarded");
        }
    }
}

impl Transport for ChannelTransport {
    fn send_text(&self, session: SessionId, frame: Bytes) {
        self.forward(Outbound::Text { session, frame });
    }

    fn send_binary(&self, session: SessionId, header: Bytes, data: Bytes) {
        self.forward(Outbound::Binary {
            session,
            header,
            data,
        });
    }
}
