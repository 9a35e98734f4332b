//! Textual frame prefix shared by every message in both directions.
//!
//! A frame reads `<ack>:<credits>:<channel>:<payload>`. The first two numbers
//! carry flow-control accounting, the third selects the logical channel.
//! Binary payloads travel out of band: the text part then carries
//! [`BINARY_MARKER`] and the raw bytes follow through the transport's binary
//! primitive.

mod error;

use bytes::{BufMut, Bytes, BytesMut};
pub use error::{FrameError, FrameField};

/// Payload placed in the text header of a binary frame.
pub const BINARY_MARKER: &str = "$$binary$$";

/// Channel reserved for handshake and control traffic.
pub const SYSTEM_CHANNEL: u32 = 0;

/// Channel carrying application data for the window's data callback.
pub const DATA_CHANNEL: u32 = 1;

/// Accounting and routing fields preceding every payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frames received since the sender last acknowledged.
    pub ack: u64,
    /// Credits the sender currently holds.
    pub credits: u64,
    /// Logical channel of the payload.
    pub channel: u32,
}

impl FrameHeader {
    /// Create a header from its three fields.
    #[must_use]
    pub const fn new(ack: u64, credits: u64, channel: u32) -> Self {
        Self {
            ack,
            credits,
            channel,
        }
    }

    /// Append `ack:credits:channel:` to `dst`.
    pub fn write(&self, dst: &mut BytesMut) {
        let prefix = format!("{}:{}:{}:", self.ack, self.credits, self.channel);
        dst.put_slice(prefix.as_bytes());
    }

    /// Encode a complete text frame carrying `payload`.
    #[must_use]
    pub fn encode_text(&self, payload: &[u8]) -> Bytes {
        let mut dst = BytesMut::with_capacity(payload.len() + 32);
        self.write(&mut dst);
        dst.put_slice(payload);
        dst.freeze()
    }

    /// Encode the text header accompanying a binary payload.
    #[must_use]
    pub fn encode_binary_header(&self) -> Bytes { self.encode_text(BINARY_MARKER.as_bytes()) }
}

/// Frame received from a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundFrame {
    /// Decoded accounting and routing fields.
    pub header: FrameHeader,
    /// Remaining bytes after the third delimiter.
    pub payload: Bytes,
}

impl InboundFrame {
    /// Decode a frame, sharing the payload with `buf` rather than copying it.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Missing`] if a numeric field is empty or lacks
    /// its `:` delimiter and [`FrameError::Overflow`] if it does not fit.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use webwindow::frame::InboundFrame;
    ///
    /// let frame = InboundFrame::decode(Bytes::from_static(b"2:7:1:hello"))
    ///     .expect("frame should decode");
    /// assert_eq!(frame.header.ack, 2);
    /// assert_eq!(frame.header.credits, 7);
    /// assert_eq!(frame.header.channel, 1);
    /// assert_eq!(&frame.payload[..], b"hello");
    /// ```
    pub fn decode(buf: Bytes) -> Result<Self, FrameError> {
        let (ack, pos) = read_field(&buf, 0, FrameField::Ack)?;
        let (credits, pos) = read_field(&buf, pos, FrameField::Credits)?;
        let (channel, pos) = read_field(&buf, pos, FrameField::Channel)?;
        let channel = u32::try_from(channel).map_err(|_| FrameError::Overflow(FrameField::Channel))?;
        Ok(Self {
            header: FrameHeader::new(ack, credits, channel),
            payload: buf.slice(pos..),
        })
    }

    /// Re-encode the frame exactly as a peer would have written it.
    #[must_use]
    pub fn encode(&self) -> Bytes { self.header.encode_text(&self.payload) }
}

/// Parse one decimal field starting at `start`, returning its value and the
/// offset just past its `:` delimiter.
fn read_field(buf: &[u8], start: usize, field: FrameField) -> Result<(u64, usize), FrameError> {
    let rest = buf.get(start..).ok_or(FrameError::Truncated {
        offset: start,
        len: buf.len(),
    })?;
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || rest.get(digits) != Some(&b':') {
        return Err(FrameError::Missing(field));
    }
    let value = rest
        .iter()
        .take(digits)
        .try_fold(0u64, |acc, d| {
            acc.checked_mul(10)?.checked_add(u64::from(d - b'0'))
        })
        .ok_or(FrameError::Overflow(field))?;
    Ok((value, start + digits + 1))
}
