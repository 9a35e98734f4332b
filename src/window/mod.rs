//! Server-side window exchanging data with its connected clients.
//!
//! A [`WebWindow`] owns the connections attached to it, their credit ledgers
//! and outbound queues, and the key table its manager fills in before
//! launching clients. All of that sits behind one mutex per window, so
//! events for the same window are processed one at a time while different
//! windows never contend.

mod flow;
mod state;

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use state::WindowState;
use tracing::{error, warn};

use crate::{
    config::{ConfigError, WindowConfig},
    error::{ErrorKind, Result, WindowError},
    frame::{DATA_CHANNEL, SYSTEM_CHANNEL},
    handler::{WindowHandler, WsEvent},
    hooks::Effect,
    metrics,
    queue::Payload,
    registry::{Connection, ConnectionId, Stage, Target},
    transport::{ProcessId, SessionId, Transport, WindowId, WindowManager},
};

/// System-channel payload asking a client to close.
pub const CLOSE: &str = "CLOSE";

/// Window shown to one or more remote clients.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use webwindow::{
///     ChannelTransport,
///     ProcessId,
///     WebWindow,
///     WindowConfig,
///     WindowId,
///     WindowManager,
/// };
///
/// struct Manager;
///
/// impl WindowManager for Manager {
///     fn halt_client(&self, _process: ProcessId) {}
///     fn unregister(&self, _window: WindowId) {}
///     fn url(&self, window: WindowId, _remote: bool) -> String { format!("/win{window}/") }
///     fn show(&self, _window: WindowId, _location: &str) -> bool { true }
///     fn wait_for(&self, _check: &mut dyn FnMut(f64) -> i32, _time_limit: f64) -> i32 { 0 }
/// }
///
/// let (transport, _frames) = ChannelTransport::new();
/// let window = WebWindow::new(
///     WindowId::new(1),
///     WindowConfig::default(),
///     Arc::new(Manager),
///     Arc::new(transport),
/// )
/// .expect("default configuration is valid");
/// window.set_data_callback(|conn, data| println!("{conn}: {}", String::from_utf8_lossy(data)));
/// assert_eq!(window.handler().name(), "win1");
/// ```
pub struct WebWindow {
    id: WindowId,
    manager: Arc<dyn WindowManager>,
    transport: Arc<dyn Transport>,
    shown: AtomicBool,
    state: Mutex<WindowState>,
}

impl WebWindow {
    /// Create a window served by `manager` whose frames leave through
    /// `transport`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `config` fails validation.
    pub fn new(
        id: WindowId,
        config: WindowConfig,
        manager: Arc<dyn WindowManager>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id,
            manager,
            transport,
            shown: AtomicBool::new(false),
            state: Mutex::new(WindowState::new(config)),
        })
    }

    /// Identifier of the window.
    #[must_use]
    pub fn id(&self) -> WindowId { self.id }

    /// Handler through which the transport delivers websocket events.
    #[must_use]
    pub fn handler(&self) -> WindowHandler<'_> { WindowHandler::new(self) }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            effect.apply(&*self.manager);
        }
    }

    pub(crate) fn process(&self, event: WsEvent) -> Result<()> {
        let session = event.session();
        if session == SessionId::new(0) {
            return Ok(());
        }
        let mut effects = Vec::new();
        let result = self.lock().process(&*self.transport, event, &mut effects);
        self.apply(effects);
        if let Err(err) = &result {
            self.report(session, err);
        }
        result
    }

    fn report(&self, session: SessionId, err: &WindowError) {
        let kind = err.kind();
        if kind == ErrorKind::Capacity {
            warn!(window = %self.id, %session, error = %err, "websocket event refused");
        } else {
            error!(window = %self.id, %session, error = %err, "websocket event rejected");
        }
        metrics::inc_errors(kind.as_str());
    }

    /// Show the panel `name` to clients instead of the default page.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PanelWithConnections`] while any connection
    /// exists; nothing changes in that case.
    pub fn set_panel_name(&self, name: impl Into<String>) -> Result<()> {
        self.lock().set_panel_name(name.into()).map_err(|err| {
            error!(window = %self.id, error = %err, "panel not configured");
            WindowError::from(err)
        })
    }

    /// Panel shown to clients, if any.
    #[must_use]
    pub fn panel_name(&self) -> Option<String> { self.lock().config.panel_name.clone() }

    /// Set the page served to clients opening the window.
    pub fn set_default_page(&self, page: impl Into<String>) {
        self.lock().config.default_page = page.into();
    }

    /// Page served to clients opening the window.
    #[must_use]
    pub fn default_page(&self) -> String { self.lock().config.default_page.clone() }

    /// Register the callback receiving channel 1 data together with the
    /// [`CONN_READY`](crate::hooks::CONN_READY) and
    /// [`CONN_CLOSED`](crate::hooks::CONN_CLOSED) notifications.
    pub fn set_data_callback<F>(&self, callback: F)
    where
        F: Fn(ConnectionId, &[u8]) + Send + Sync + 'static,
    {
        self.lock().data_callback = Some(Arc::new(callback));
    }

    /// Register the callback receiving data on channels above 1 for one
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::UnknownConnection`] if `connection` does not
    /// exist.
    pub fn set_channel_callback<F>(&self, connection: ConnectionId, callback: F) -> Result<()>
    where
        F: Fn(ConnectionId, &[u8]) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let conn = state
            .registry
            .get_mut(connection)
            .ok_or(WindowError::UnknownConnection(connection))?;
        conn.channel_callback = Some(Arc::new(callback));
        Ok(())
    }

    /// Register a one-time `key` identifying the client `process`.
    pub fn add_key(&self, key: impl Into<String>, process: ProcessId) {
        self.lock().keys.insert(key, process);
    }

    /// Whether `key` is registered and not yet consumed.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool { self.lock().keys.contains(key) }

    /// Withdraw `key`, returning the process it was registered for.
    pub fn remove_key(&self, key: &str) -> Option<ProcessId> { self.lock().keys.take(key) }

    /// Number of attached connections.
    #[must_use]
    pub fn num_connections(&self) -> usize { self.lock().registry.len() }

    /// Id of the connection at `index` in attachment order.
    #[must_use]
    pub fn connection_id(&self, index: usize) -> Option<ConnectionId> {
        self.lock().registry.at(index).map(Connection::id)
    }

    /// Id of the connection attached to `session`.
    #[must_use]
    pub fn connection_for(&self, session: SessionId) -> Option<ConnectionId> {
        let state = self.lock();
        let index = state.registry.position(session)?;
        state.registry.at(index).map(Connection::id)
    }

    /// Handshake stage of `connection`.
    #[must_use]
    pub fn connection_stage(&self, connection: ConnectionId) -> Option<Stage> {
        self.lock().registry.get(connection).map(Connection::stage)
    }

    /// Run `f` on the connection with id `connection`.
    pub fn inspect<R>(&self, connection: ConnectionId, f: impl FnOnce(&Connection) -> R) -> Option<R> {
        self.lock().registry.get(connection).map(f)
    }

    /// Send text to `target` on the data channel.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::QueueFull`] listing the connections whose queue
    /// was full. Every other addressed connection still receives the data.
    pub fn send(&self, target: impl Into<Target>, data: &str) -> Result<()> {
        self.send_on_channel(target, DATA_CHANNEL, Payload::text(data))
    }

    /// Send binary data to `target` on the data channel.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::QueueFull`] as for [`send`](Self::send).
    pub fn send_binary(&self, target: impl Into<Target>, data: impl Into<Bytes>) -> Result<()> {
        self.send_on_channel(target, DATA_CHANNEL, Payload::binary(data))
    }

    /// Send `payload` to `target` on `channel`.
    ///
    /// Connections with an empty queue and positive credit receive the frame
    /// immediately; others queue it until credit arrives.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::QueueFull`] as for [`send`](Self::send).
    pub fn send_on_channel(&self, target: impl Into<Target>, channel: u32, payload: Payload) -> Result<()> {
        let (dropped, max) = {
            let mut state = self.lock();
            let dropped = state.submit(&*self.transport, target.into(), channel, payload);
            (dropped, state.config.max_queue_length)
        };
        if dropped.is_empty() {
            Ok(())
        } else {
            Err(WindowError::QueueFull { dropped, max })
        }
    }

    /// Whether a send to `target` would be accepted. With `direct`, whether
    /// it would be transmitted without queuing.
    #[must_use]
    pub fn can_send(&self, target: impl Into<Target>, direct: bool) -> bool {
        self.lock().can_send(target.into(), direct)
    }

    /// Ask every client to close.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::QueueFull`] for clients whose queue was full.
    pub fn close_connections(&self) -> Result<()> {
        self.send_on_channel(Target::All, SYSTEM_CHANNEL, Payload::text(CLOSE))
    }

    /// Ask the client of `connection` to close.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::QueueFull`] if its queue was full.
    pub fn close_connection(&self, connection: ConnectionId) -> Result<()> {
        self.send_on_channel(connection, SYSTEM_CHANNEL, Payload::text(CLOSE))
    }

    /// URL under which the window is reachable.
    #[must_use]
    pub fn url(&self, remote: bool) -> String { self.manager.url(self.id, remote) }

    /// Display the window at `location`.
    pub fn show(&self, location: &str) -> bool {
        let shown = self.manager.show(self.id, location);
        if shown {
            self.shown.store(true, Ordering::Release);
        }
        shown
    }

    /// Whether the window was shown at least once.
    #[must_use]
    pub fn is_shown(&self) -> bool { self.shown.load(Ordering::Acquire) }

    /// Run the manager's wait loop until `check` returns non-zero or
    /// `time_limit` seconds pass.
    pub fn wait_for(&self, mut check: impl FnMut(f64) -> i32, time_limit: f64) -> i32 {
        self.manager.wait_for(&mut check, time_limit)
    }

    /// Address of `other` relative to this window's address.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::ForeignManager`] if the windows belong to
    /// different managers.
    pub fn relative_addr(&self, other: &WebWindow) -> Result<String> {
        if !std::ptr::addr_eq(Arc::as_ptr(&self.manager), Arc::as_ptr(&other.manager)) {
            error!(window = %self.id, other = %other.id, "same web window manager should be used");
            return Err(WindowError::ForeignManager);
        }
        Ok(format!("../{}/", other.handler().name()))
    }
}

impl Drop for WebWindow {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let processes: Vec<ProcessId> = state
            .registry
            .clear()
            .iter()
            .filter_map(Connection::process)
            .collect();
        for process in processes {
            self.manager.halt_client(process);
        }
        self.manager.unregister(self.id);
    }
}

impl std::fmt::Debug for WebWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebWindow")
            .field("id", &self.id)
            .field("shown", &self.is_shown())
            .finish_non_exhaustive()
    }
}
