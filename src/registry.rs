//! Registry of the connections attached to one window.
//!
//! Connections are kept in creation order and looked up by the session id the
//! transport assigned or by the window-scoped [`ConnectionId`] handed to the
//! application. Ids count up from 1 and are never reused.

use std::fmt;

use tracing::error;

use crate::{
    credit::CreditLedger,
    hooks::ChannelCallback,
    metrics::{self, Direction},
    queue::{OutboundQueue, Payload, QueueItem},
    transport::{ProcessId, SessionId, Transport},
};

numeric_id! {
    /// Window-scoped identifier of a connection.
    ConnectionId(u32)
}

/// Connections an outbound send is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Every connection of the window.
    All,
    /// A single connection.
    Connection(ConnectionId),
}

impl Target {
    /// Whether `id` is addressed by this target.
    #[must_use]
    pub fn matches(self, id: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Connection(target) => target == id,
        }
    }
}

impl From<ConnectionId> for Target {
    fn from(id: ConnectionId) -> Self { Self::Connection(id) }
}

/// Handshake progress of a connection. Stages are ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Attached, waiting for the client's `READY` announcement.
    Pending = 0,
    /// Asked to show a panel, waiting for `PANEL_READY`.
    PanelWait = 5,
    /// Handshake complete; application data flows.
    Ready = 10,
}

/// RAII guard keeping the active-connections gauge in step with the
/// connections that exist.
#[derive(Debug)]
struct ActiveConnection;

impl ActiveConnection {
    fn new() -> Self {
        metrics::inc_connections();
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) { metrics::dec_connections(); }
}

/// State of one client session.
pub struct Connection {
    id: ConnectionId,
    session: SessionId,
    pub(crate) process: Option<ProcessId>,
    pub(crate) stage: Stage,
    pub(crate) ledger: CreditLedger,
    pub(crate) queue: OutboundQueue,
    pub(crate) channel_callback: Option<ChannelCallback>,
    _active: ActiveConnection,
}

impl Connection {
    fn new(id: ConnectionId, session: SessionId, credits: u64, max_queue: usize) -> Self {
        Self {
            id,
            session,
            process: None,
            stage: Stage::Pending,
            ledger: CreditLedger::new(credits),
            queue: OutboundQueue::new(max_queue),
            channel_callback: None,
            _active: ActiveConnection::new(),
        }
    }

    /// Window-scoped id of the connection.
    #[must_use]
    pub fn id(&self) -> ConnectionId { self.id }

    /// Session id assigned by the transport.
    #[must_use]
    pub fn session(&self) -> SessionId { self.session }

    /// Client process resolved during the handshake.
    #[must_use]
    pub fn process(&self) -> Option<ProcessId> { self.process }

    /// Current handshake stage.
    #[must_use]
    pub fn stage(&self) -> Stage { self.stage }

    /// Credit counters of the connection.
    #[must_use]
    pub fn ledger(&self) -> &CreditLedger { &self.ledger }

    /// Number of frames waiting for credit.
    #[must_use]
    pub fn queued(&self) -> usize { self.queue.len() }

    /// Stamp `item` with the accounting prefix and hand it to the transport.
    ///
    /// Returns `false`, leaving all counters untouched, when the connection
    /// has no credit.
    pub(crate) fn transmit(&mut self, transport: &dyn Transport, item: QueueItem) -> bool {
        let Some(header) = self.ledger.stamp(item.channel) else {
            error!(connection = %self.id, "no credits to send data via connection");
            return false;
        };
        match item.payload {
            Payload::Text(data) => transport.send_text(self.session, header.encode_text(&data)),
            Payload::Binary(data) => {
                transport.send_binary(self.session, header.encode_binary_header(), data);
            }
        }
        metrics::inc_frames(Direction::Outbound);
        true
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("session", &self.session)
            .field("process", &self.process)
            .field("stage", &self.stage)
            .field("ledger", &self.ledger)
            .field("queued", &self.queue.len())
            .field("channel_callback", &self.channel_callback.is_some())
            .finish()
    }
}

/// Ordered set of a window's connections.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
    last_id: u32,
    limit: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry admitting at most `limit` connections, or any
    /// number when `limit` is zero.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            connections: Vec::new(),
            last_id: 0,
            limit,
        }
    }

    /// Configured connection limit; zero means unlimited.
    #[must_use]
    pub fn limit(&self) -> usize { self.limit }

    /// Whether another connection would exceed the limit.
    #[must_use]
    pub fn is_full(&self) -> bool { self.limit > 0 && self.connections.len() >= self.limit }

    /// Attach a new connection for `session` and return its id.
    ///
    /// Callers check [`position`](Self::position) and
    /// [`is_full`](Self::is_full) first.
    pub fn create(&mut self, session: SessionId, credits: u64, max_queue: usize) -> ConnectionId {
        self.last_id += 1;
        let id = ConnectionId(self.last_id);
        self.connections
            .push(Connection::new(id, session, credits, max_queue));
        id
    }

    /// Position of the connection attached to `session`.
    #[must_use]
    pub fn position(&self, session: SessionId) -> Option<usize> {
        self.connections.iter().position(|c| c.session == session)
    }

    /// Connection at `index` in creation order.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Connection> { self.connections.get(index) }

    /// Mutable connection at `index` in creation order.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Connection> {
        self.connections.get_mut(index)
    }

    /// Connection with the given id.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Mutable connection with the given id.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    /// Detach the connection at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Connection> {
        (index < self.connections.len()).then(|| self.connections.remove(index))
    }

    /// Detach every connection.
    pub fn clear(&mut self) -> Vec<Connection> { std::mem::take(&mut self.connections) }

    /// Iterate over connections in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> { self.connections.iter() }

    /// Mutably iterate over connections in creation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }

    /// Number of attached connections.
    #[must_use]
    pub fn len(&self) -> usize { self.connections.len() }

    /// Whether no connection is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.connections.is_empty() }
}
