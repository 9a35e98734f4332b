//! Entry point for websocket events reported by the transport.

use bytes::Bytes;

use crate::{error::Result, transport::SessionId, window::WebWindow};

/// Websocket event reported by the transport for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WsEvent {
    /// A client asks to open a websocket.
    Connect {
        /// Session requesting the connection.
        session: SessionId,
    },
    /// The websocket is open and can carry data.
    Ready {
        /// Session that became ready.
        session: SessionId,
    },
    /// A frame arrived.
    Data {
        /// Session the frame arrived on.
        session: SessionId,
        /// Raw frame bytes.
        payload: Bytes,
    },
    /// The websocket closed.
    Close {
        /// Session that closed.
        session: SessionId,
    },
    /// Any request the window does not handle.
    Other {
        /// Session the request belongs to.
        session: SessionId,
        /// Method name reported by the transport.
        method: String,
    },
}

impl WsEvent {
    /// Build an event from a transport method name such as `WS_DATA`.
    ///
    /// `payload` is only kept for `WS_DATA`.
    #[must_use]
    pub fn from_method(method: &str, session: SessionId, payload: Bytes) -> Self {
        match method {
            "WS_CONNECT" => Self::Connect { session },
            "WS_READY" => Self::Ready { session },
            "WS_DATA" => Self::Data { session, payload },
            "WS_CLOSE" => Self::Close { session },
            other => Self::Other {
                session,
                method: other.to_owned(),
            },
        }
    }

    /// Session the event belongs to.
    #[must_use]
    pub fn session(&self) -> SessionId {
        match self {
            Self::Connect { session }
            | Self::Ready { session }
            | Self::Data { session, .. }
            | Self::Close { session }
            | Self::Other { session, .. } => *session,
        }
    }
}

/// Borrowed view of a window used by the transport to deliver events.
///
/// The handler never outlives the window it was obtained from.
#[derive(Clone, Copy, Debug)]
pub struct WindowHandler<'w> {
    window: &'w WebWindow,
}

impl<'w> WindowHandler<'w> {
    pub(crate) fn new(window: &'w WebWindow) -> Self { Self { window } }

    /// Name under which the transport serves the window, `win<id>`.
    #[must_use]
    pub fn name(&self) -> String { format!("win{}", self.window.id()) }

    /// Content of the page served to clients.
    #[must_use]
    pub fn default_page_content(&self) -> String { self.window.default_page() }

    /// Process one websocket event.
    ///
    /// Events for session 0 are accepted without effect.
    ///
    /// # Errors
    ///
    /// Returns a [`WindowError`](crate::WindowError) when the event is
    /// rejected; the error has already been logged.
    pub fn process(&self, event: WsEvent) -> Result<()> { self.window.process(event) }
}
