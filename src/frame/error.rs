//! Errors raised while decoding inbound frames.

use std::fmt;

use thiserror::Error;

/// Numeric field of the frame prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameField {
    /// Count of operations the peer acknowledges.
    Ack,
    /// Receive credits advertised by the peer.
    Credits,
    /// Logical channel the payload belongs to.
    Channel,
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ack => "number of acknowledged operations",
            Self::Credits => "can_send counter",
            Self::Channel => "channel number",
        })
    }
}

/// Reasons an inbound frame is rejected.
///
/// A rejected frame never reaches the credit ledger, so accounting stays
/// consistent regardless of what the peer sends.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The field has no digits or lacks its trailing `:`.
    #[error("missing {0}")]
    Missing(FrameField),
    /// The digits do not fit the field.
    #[error("{0} out of range")]
    Overflow(FrameField),
    /// The payload offset lies beyond the end of the buffer.
    #[error("corrupted buffer: payload offset {offset} exceeds length {len}")]
    Truncated {
        /// Offset at which the payload would start.
        offset: usize,
        /// Physical length of the received buffer.
        len: usize,
    },
}
