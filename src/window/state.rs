//! Handshake state machine and channel dispatch.
//!
//! Everything here runs with the window's lock held. Callback invocations
//! and process halts are collected as [`Effect`]s and applied by the caller
//! once the lock is released.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{
    config::{ConfigError, PANEL_PAGE, WindowConfig},
    error::{Result, WindowError},
    frame::{DATA_CHANNEL, InboundFrame, SYSTEM_CHANNEL},
    handler::WsEvent,
    hooks::{CONN_CLOSED, CONN_READY, DataCallback, Effect},
    keys::KeyTable,
    metrics::{self, Direction},
    queue::Payload,
    registry::{ConnectionId, ConnectionRegistry, Stage, Target},
    transport::{SessionId, Transport},
};

/// Prefix of the client's announcement on the system channel.
const READY_PREFIX: &[u8] = b"READY=";
/// Client confirmation that the requested panel is up.
const PANEL_READY: &[u8] = b"PANEL_READY";

/// Mutable state of a window, guarded by its mutex.
pub(super) struct WindowState {
    pub(super) config: WindowConfig,
    pub(super) registry: ConnectionRegistry,
    pub(super) keys: KeyTable,
    pub(super) data_callback: Option<DataCallback>,
}

impl WindowState {
    pub(super) fn new(config: WindowConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(config.connection_limit),
            config,
            keys: KeyTable::default(),
            data_callback: None,
        }
    }

    pub(super) fn process(
        &mut self,
        transport: &dyn Transport,
        event: WsEvent,
        effects: &mut Vec<Effect>,
    ) -> Result<()> {
        match event {
            WsEvent::Connect { .. } => self.admit(),
            WsEvent::Ready { session } => self.attach(session),
            WsEvent::Data { session, payload } => self.receive(transport, session, payload, effects),
            WsEvent::Close { session } => {
                self.detach(session, effects);
                Ok(())
            }
            WsEvent::Other { method, .. } => Err(WindowError::UnexpectedEvent(method)),
        }
    }

    pub(super) fn set_panel_name(&mut self, name: String) -> Result<(), ConfigError> {
        if !self.registry.is_empty() {
            return Err(ConfigError::PanelWithConnections);
        }
        self.config.panel_name = Some(name);
        PANEL_PAGE.clone_into(&mut self.config.default_page);
        Ok(())
    }

    fn admit(&self) -> Result<()> {
        if self.registry.is_full() {
            return Err(WindowError::ConnectionLimit {
                limit: self.registry.limit(),
            });
        }
        Ok(())
    }

    fn attach(&mut self, session: SessionId) -> Result<()> {
        if self.registry.position(session).is_some() {
            return Err(WindowError::DuplicateSession(session));
        }
        self.admit()?;
        let id = self.registry.create(
            session,
            self.config.initial_credits,
            self.config.max_queue_length,
        );
        debug!(connection = %id, %session, "connection attached");
        Ok(())
    }

    fn detach(&mut self, session: SessionId, effects: &mut Vec<Effect>) {
        let Some(conn) = self
            .registry
            .position(session)
            .and_then(|index| self.registry.remove(index))
        else {
            return;
        };
        debug!(connection = %conn.id(), %session, "connection closed");
        self.notify(effects, conn.id(), Bytes::from_static(CONN_CLOSED.as_bytes()));
        if let Some(process) = conn.process() {
            effects.push(Effect::Halt(process));
        }
    }

    fn receive(
        &mut self,
        transport: &dyn Transport,
        session: SessionId,
        payload: Bytes,
        effects: &mut Vec<Effect>,
    ) -> Result<()> {
        let index = self
            .registry
            .position(session)
            .ok_or(WindowError::UnknownSession(session))?;
        if payload.is_empty() {
            return Ok(());
        }
        let InboundFrame { header, payload } = InboundFrame::decode(payload)?;
        metrics::inc_frames(Direction::Inbound);

        let conn = self
            .registry
            .at_mut(index)
            .ok_or(WindowError::UnknownSession(session))?;
        conn.ledger.on_inbound(&header);
        let (id, stage, channel) = (conn.id(), conn.stage, header.channel);

        match (channel, stage) {
            (SYSTEM_CHANNEL, Stage::Pending) if payload.starts_with(READY_PREFIX) => {
                let key = String::from_utf8_lossy(&payload[READY_PREFIX.len()..]);
                self.authorize(transport, index, session, &key, effects)?;
            }
            (SYSTEM_CHANNEL, _) => trace!(connection = %id, "system message ignored"),
            (_, Stage::Pending) => {
                self.registry.remove(index);
                return Err(WindowError::UnexpectedData {
                    connection: id,
                    channel,
                });
            }
            (_, Stage::PanelWait) => self.confirm_panel(index, &payload, effects),
            (DATA_CHANNEL, Stage::Ready) => self.notify(effects, id, payload),
            (_, Stage::Ready) => {
                match self
                    .registry
                    .at(index)
                    .and_then(|c| c.channel_callback.as_ref())
                {
                    Some(callback) => effects.push(Effect::notify(callback, id, payload)),
                    None => debug!(connection = %id, channel, "no callback for channel; data dropped"),
                }
            }
        }

        self.drain(transport);
        Ok(())
    }

    /// Resolve the client's key, then either request the panel or declare the
    /// connection ready.
    fn authorize(
        &mut self,
        transport: &dyn Transport,
        index: usize,
        session: SessionId,
        key: &str,
        effects: &mut Vec<Effect>,
    ) -> Result<()> {
        let process = self.keys.take(key);
        if process.is_none() && self.config.native_only {
            self.registry.remove(index);
            warn!(%session, key, "unknown key refused by native-only window");
            return Err(WindowError::UnauthorizedKey(session));
        }

        let conn = self
            .registry
            .at_mut(index)
            .ok_or(WindowError::UnknownSession(session))?;
        if let Some(process) = process {
            debug!(key, %process, "found key for process");
            conn.process = Some(process);
        }
        let id = conn.id();

        if let Some(panel) = self.config.panel_name.clone() {
            conn.stage = Stage::PanelWait;
            let showpanel = Payload::text(&format!("SHOWPANEL:{panel}"));
            let dropped = self.submit(transport, Target::Connection(id), SYSTEM_CHANNEL, showpanel);
            if !dropped.is_empty() {
                // Without the directive the client can never confirm the panel.
                warn!(connection = %id, "panel request dropped; connection removed");
                if let Some(process) = self.registry.remove(index).and_then(|c| c.process()) {
                    effects.push(Effect::Halt(process));
                }
                return Err(WindowError::QueueFull {
                    dropped,
                    max: self.config.max_queue_length,
                });
            }
        } else {
            conn.stage = Stage::Ready;
            self.notify(effects, id, Bytes::from_static(CONN_READY.as_bytes()));
        }
        Ok(())
    }

    fn confirm_panel(&mut self, index: usize, payload: &[u8], effects: &mut Vec<Effect>) {
        let Some(conn) = self.registry.at_mut(index) else {
            return;
        };
        let id = conn.id();
        if payload == PANEL_READY {
            debug!(connection = %id, panel = ?self.config.panel_name, "panel ready");
            conn.stage = Stage::Ready;
            self.notify(effects, id, Bytes::from_static(CONN_READY.as_bytes()));
        } else {
            debug!(connection = %id, "panel aborted");
            self.notify(effects, id, Bytes::from_static(CONN_CLOSED.as_bytes()));
            self.registry.remove(index);
        }
    }

    fn notify(&self, effects: &mut Vec<Effect>, connection: ConnectionId, payload: Bytes) {
        if let Some(callback) = &self.data_callback {
            effects.push(Effect::notify(callback, connection, payload));
        }
    }
}
