//! Credit-gated submission and the drain pass.

use tracing::{debug, error};

use super::state::WindowState;
use crate::{
    frame::SYSTEM_CHANNEL,
    metrics,
    queue::{Payload, QueueItem},
    registry::{ConnectionId, Target},
    transport::Transport,
};

/// System-channel payload refreshing the peer's accounting.
pub(crate) const KEEPALIVE: &str = "KEEPALIVE";

impl WindowState {
    /// Transmit `payload` to every connection matched by `target`, queuing it
    /// where credit or earlier traffic stands in the way, then drain.
    ///
    /// Returns the connections whose queue was full; they did not get the
    /// payload.
    pub(super) fn submit(
        &mut self,
        transport: &dyn Transport,
        target: Target,
        channel: u32,
        payload: Payload,
    ) -> Vec<ConnectionId> {
        let mut dropped = Vec::new();
        for conn in self.registry.iter_mut().filter(|c| target.matches(c.id())) {
            let item = QueueItem {
                channel,
                payload: payload.clone(),
            };
            if conn.queue.is_empty() && conn.ledger.can_send() {
                conn.transmit(transport, item);
            } else if let Err(full) = conn.queue.push(item) {
                error!(connection = %conn.id(), max = full.max, "maximum queue length achieved");
                metrics::inc_queue_overflow();
                dropped.push(conn.id());
            }
        }
        self.drain(transport);
        dropped
    }

    /// Sweep all connections, sending one queued frame or keep-alive per
    /// connection with credit, until a sweep makes no progress.
    pub(super) fn drain(&mut self, transport: &dyn Transport) {
        loop {
            let mut progressed = false;
            for conn in self.registry.iter_mut() {
                if !conn.ledger.can_send() {
                    continue;
                }
                if let Some(item) = conn.queue.pop() {
                    progressed |= conn.transmit(transport, item);
                } else if conn.ledger.wants_keepalive() {
                    debug!(connection = %conn.id(), "send keep alive to client");
                    let keepalive = QueueItem {
                        channel: SYSTEM_CHANNEL,
                        payload: Payload::text(KEEPALIVE),
                    };
                    progressed |= conn.transmit(transport, keepalive);
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// Whether a send to `target` would be accepted; with `direct`, whether
    /// it would go out without queuing.
    pub(super) fn can_send(&self, target: Target, direct: bool) -> bool {
        self.registry
            .iter()
            .filter(|c| target.matches(c.id()))
            .all(|c| {
                let blocked = direct && (!c.queue.is_empty() || !c.ledger.can_send());
                !blocked && !c.queue.is_full()
            })
    }
}
