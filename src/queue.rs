//! Bounded FIFO of frames waiting for send credit.

use std::collections::VecDeque;

use bytes::Bytes;
use thiserror::Error;

/// Queue depth used when none is configured.
pub const DEFAULT_MAX_QUEUE_LENGTH: usize = 10;
/// Highest queue depth a window may be configured with.
pub const MAX_QUEUE_CAPACITY: usize = 10_000;

/// Outbound payload together with its wire representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text sent inline after the frame prefix.
    Text(Bytes),
    /// Raw bytes sent through the transport's binary path.
    Binary(Bytes),
}

impl Payload {
    /// Build a text payload.
    #[must_use]
    pub fn text(data: &str) -> Self { Self::Text(Bytes::copy_from_slice(data.as_bytes())) }

    /// Build a binary payload.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self { Self::Binary(data.into()) }

    /// Whether the payload goes out as text.
    #[must_use]
    pub fn is_text(&self) -> bool { matches!(self, Self::Text(_)) }

    /// Raw payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(b) | Self::Binary(b) => b,
        }
    }
}

/// Frame waiting in a connection's outbound queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueItem {
    /// Channel the payload is addressed to.
    pub channel: u32,
    /// Payload to transmit.
    pub payload: Payload,
}

/// Returned when an item does not fit in the queue.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("maximum queue length {max} achieved")]
pub struct QueueFull {
    /// Configured maximum depth.
    pub max: usize,
    /// Item that was refused.
    pub item: QueueItem,
}

/// Per-connection outbound FIFO with a fixed maximum depth.
#[derive(Debug)]
pub struct OutboundQueue {
    items: VecDeque<QueueItem>,
    max_len: usize,
}

impl OutboundQueue {
    /// Create an empty queue accepting at most `max_len` items.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_len,
        }
    }

    /// Append `item` at the back of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`], handing the item back, when the queue already
    /// holds its maximum number of items.
    pub fn push(&mut self, item: QueueItem) -> Result<(), QueueFull> {
        if self.is_full() {
            return Err(QueueFull {
                max: self.max_len,
                item,
            });
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Remove the oldest item.
    pub fn pop(&mut self) -> Option<QueueItem> { self.items.pop_front() }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize { self.items.len() }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Whether the queue has reached its maximum depth.
    #[must_use]
    pub fn is_full(&self) -> bool { self.items.len() >= self.max_len }

    /// Configured maximum depth.
    #[must_use]
    pub fn max_len(&self) -> usize { self.max_len }
}
