//! Per-connection credit accounting.
//!
//! Each side may only transmit while it holds send credits. Every outbound
//! frame spends one credit and carries the number of frames received since
//! the previous outbound frame; the peer adds that acknowledgment to its own
//! credits. When the link goes quiet the server pushes a keep-alive so the
//! peer learns fresh numbers before it stalls.

use crate::frame::FrameHeader;

/// Peer credit level below which a keep-alive is considered.
pub const KEEPALIVE_LOW_WATER: u64 = 3;

/// Send credits granted to a new connection unless configured otherwise.
pub const DEFAULT_INITIAL_CREDITS: u64 = 10;

/// Credit and acknowledgment counters of one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreditLedger {
    send_credits: u64,
    recv_count: u64,
    peer_credits: u64,
}

impl CreditLedger {
    /// Create a ledger holding `initial` send credits.
    #[must_use]
    pub fn new(initial: u64) -> Self {
        Self {
            send_credits: initial,
            recv_count: 0,
            peer_credits: 0,
        }
    }

    /// Account for a successfully decoded inbound frame.
    pub fn on_inbound(&mut self, header: &FrameHeader) {
        self.send_credits = self.send_credits.saturating_add(header.ack);
        self.recv_count += 1;
        self.peer_credits = header.credits;
    }

    /// Whether a frame may be transmitted right now.
    #[must_use]
    pub fn can_send(&self) -> bool { self.send_credits > 0 }

    /// Spend one credit and produce the header for an outbound frame on
    /// `channel`.
    ///
    /// The header carries the receive count, which is then reset, and the
    /// credit count before it is decremented. Returns `None` without touching
    /// the counters when no credit is left.
    pub fn stamp(&mut self, channel: u32) -> Option<FrameHeader> {
        if !self.can_send() {
            return None;
        }
        let header = FrameHeader::new(self.recv_count, self.send_credits, channel);
        self.recv_count = 0;
        self.send_credits -= 1;
        Some(header)
    }

    /// Whether the peer should be sent a keep-alive, assuming nothing is
    /// queued for it.
    #[must_use]
    pub fn wants_keepalive(&self) -> bool {
        self.can_send() && self.peer_credits < KEEPALIVE_LOW_WATER && self.recv_count > 1
    }

    /// Credits currently available for sending.
    #[must_use]
    pub fn send_credits(&self) -> u64 { self.send_credits }

    /// Frames received since the last outbound frame.
    #[must_use]
    pub fn recv_count(&self) -> u64 { self.recv_count }

    /// Receive credits last advertised by the peer.
    #[must_use]
    pub fn peer_credits(&self) -> u64 { self.peer_credits }
}

impl Default for CreditLedger {
    fn default() -> Self { Self::new(DEFAULT_INITIAL_CREDITS) }
}
