//! Window harness playing the client side of the protocol.

use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedReceiver;
use webwindow::{
    ChannelTransport,
    ConnectionId,
    FrameHeader,
    Outbound,
    SessionId,
    WebWindow,
    WindowConfig,
    WindowId,
    WsEvent,
};

use crate::manager::RecordingManager;

/// Payload delivered to a window callback.
pub type Delivery = (ConnectionId, Vec<u8>);

/// Encode a frame as a client would send it.
#[must_use]
pub fn client_frame(ack: u64, credits: u64, channel: u32, payload: &str) -> Bytes {
    FrameHeader::new(ack, credits, channel).encode_text(payload.as_bytes())
}

/// Window wired to in-memory collaborators.
pub struct Harness {
    /// Window under test.
    pub window: WebWindow,
    /// Manager the window reports to.
    pub manager: Arc<RecordingManager>,
    frames: UnboundedReceiver<Outbound>,
    delivered: Arc<Mutex<Vec<Delivery>>>,
}

impl Harness {
    /// Build a harness around a window with id 1.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self::with_manager(WindowId::new(1), config, Arc::new(RecordingManager::default()))
    }

    /// Build a harness sharing `manager`.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    #[must_use]
    pub fn with_manager(id: WindowId, config: WindowConfig, manager: Arc<RecordingManager>) -> Self {
        let (transport, frames) = ChannelTransport::new();
        let window = WebWindow::new(id, config, manager.clone(), Arc::new(transport))
            .expect("harness configuration should be valid");
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        window.set_data_callback(move |conn, data| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((conn, data.to_vec()));
        });
        Self {
            window,
            manager,
            frames,
            delivered,
        }
    }

    /// Deliver a websocket event for `session`.
    ///
    /// # Errors
    ///
    /// Propagates the window's rejection.
    pub fn event(&self, event: WsEvent) -> webwindow::Result<()> { self.window.handler().process(event) }

    /// Run `WS_CONNECT` and `WS_READY` for `session` and return the new
    /// connection.
    ///
    /// # Errors
    ///
    /// Propagates the window's rejection.
    pub fn attach(&self, session: u64) -> webwindow::Result<ConnectionId> {
        let session = SessionId::new(session);
        self.event(WsEvent::Connect { session })?;
        self.event(WsEvent::Ready { session })?;
        Ok(self
            .window
            .connection_for(session)
            .expect("attached connection should be registered"))
    }

    /// Attach `session` and announce it with `READY=<key>`.
    ///
    /// # Errors
    ///
    /// Propagates the window's rejection.
    pub fn handshake(&self, session: u64, key: &str) -> webwindow::Result<ConnectionId> {
        let conn = self.attach(session)?;
        self.client(session, 0, 0, &format!("READY={key}"))?;
        Ok(conn)
    }

    /// Send a client frame on `channel` acknowledging `ack` frames and
    /// advertising plenty of receive credit.
    ///
    /// # Errors
    ///
    /// Propagates the window's rejection.
    pub fn client(&self, session: u64, ack: u64, channel: u32, payload: &str) -> webwindow::Result<()> {
        self.raw(session, client_frame(ack, 10, channel, payload))
    }

    /// Deliver raw bytes as a `WS_DATA` event.
    ///
    /// # Errors
    ///
    /// Propagates the window's rejection.
    pub fn raw(&self, session: u64, payload: Bytes) -> webwindow::Result<()> {
        self.event(WsEvent::Data {
            session: SessionId::new(session),
            payload,
        })
    }

    /// Frames sent since the last call.
    pub fn sent(&mut self) -> Vec<Outbound> {
        std::iter::from_fn(|| self.frames.try_recv().ok()).collect()
    }

    /// Text part of the frames sent since the last call.
    pub fn sent_text(&mut self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|frame| String::from_utf8_lossy(frame.text()).into_owned())
            .collect()
    }

    /// Payloads delivered to the data callback since the last call.
    pub fn delivered(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.delivered.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Payloads delivered to the data callback as strings.
    pub fn delivered_text(&self) -> Vec<(ConnectionId, String)> {
        self.delivered()
            .into_iter()
            .map(|(conn, data)| (conn, String::from_utf8_lossy(&data).into_owned()))
            .collect()
    }
}
