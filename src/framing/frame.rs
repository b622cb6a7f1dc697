//! Application-message framing inside the data-plane byte stream.
//!
//! Two header conventions are accepted on ingest; one is emitted on egress.
//!
//! CStyle (emitted):
//! ```text
//! +------------------+----------+--------------------+-----------+
//! | Lead (>= 0x80)   | Reserved | Payload Length     | Payload   |
//! | 1 byte, opcode   | 1 byte   | 2 bytes (LE16)     | N bytes   |
//! | in low nibble    | (0x00)   |                    |           |
//! +------------------+----------+--------------------+-----------+
//! ```
//!
//! CompactStyle (accepted only):
//! ```text
//! +------------------+--------------------+-----------+
//! | Lead (0..=5)     | Payload Length     | Payload   |
//! | 1 byte           | 4 bytes (LE32)     | N bytes   |
//! +------------------+--------------------+-----------+
//! ```
//!
//! The header style is detected from the lead byte. Any other lead byte is
//! skipped one byte at a time until a recognizable header shows up, so a run
//! of garbage costs O(n) and never fails the stream.

use thiserror::Error;

use crate::core::constants::{
    COMPACT_HEADER_LEN, COMPACT_LEAD_MAX, CSTYLE_BINARY_LEAD, CSTYLE_HEADER_LEN, CSTYLE_LEAD_MIN,
    MAX_CSTYLE_PAYLOAD,
};
use crate::core::{DecodeError, MessageCodec};

/// Errors produced when building frames.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Payload does not fit the header or the frame budget.
    #[error("payload of {len} bytes exceeds the limit of {max} bytes")]
    PayloadTooLarge {
        /// Payload length.
        len: usize,
        /// Effective limit.
        max: usize,
    },
}

/// Header convention a frame arrived with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderStyle {
    /// 4-byte header with a 16-bit length.
    CStyle,
    /// 5-byte header with a 32-bit length.
    Compact,
}

impl HeaderStyle {
    /// Header length in bytes.
    pub fn header_len(self) -> usize {
        match self {
            Self::CStyle => CSTYLE_HEADER_LEN,
            Self::Compact => COMPACT_HEADER_LEN,
        }
    }
}

/// A complete frame borrowed from the scanned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Header convention.
    pub style: HeaderStyle,
    /// CStyle: low nibble of the lead byte. Compact: the discriminator byte.
    pub opcode: u8,
    /// Payload bytes.
    pub payload: &'a [u8],
}

impl RawFrame<'_> {
    /// Bytes this frame occupies in the stream.
    pub fn wire_len(&self) -> usize {
        self.style.header_len() + self.payload.len()
    }
}

/// Outcome of looking at the head of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep<'a> {
    /// Not enough bytes yet; nothing may be discarded.
    NeedMore,
    /// Lead byte is not a header; discard exactly one byte.
    Resync,
    /// A complete frame is available.
    Frame(RawFrame<'a>),
}

/// Encode one payload with a CStyle header.
///
/// `max_payload` is the caller's per-frame budget; the effective limit is the
/// smaller of it and what a 16-bit length can describe.
pub fn encode(payload: &[u8], max_payload: usize) -> Result<Vec<u8>, FrameError> {
    let max = max_payload.min(MAX_CSTYLE_PAYLOAD);
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max,
        });
    }

    let len = (payload.len() as u16).to_le_bytes();
    let mut frame = Vec::with_capacity(CSTYLE_HEADER_LEN + payload.len());
    frame.extend_from_slice(&[CSTYLE_BINARY_LEAD, 0x00, len[0], len[1]]);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Inspect the head of `buf`.
pub fn next_frame(buf: &[u8]) -> FrameStep<'_> {
    if buf.len() < CSTYLE_HEADER_LEN {
        return FrameStep::NeedMore;
    }

    let lead = buf[0];
    let (style, opcode, payload_len) = if lead >= CSTYLE_LEAD_MIN {
        let len = u16::from_le_bytes([buf[2], buf[3]]) as usize;
        (HeaderStyle::CStyle, lead & 0x0F, len)
    } else if lead <= COMPACT_LEAD_MAX {
        if buf.len() < COMPACT_HEADER_LEN {
            return FrameStep::NeedMore;
        }
        let len = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        (HeaderStyle::Compact, lead, len)
    } else {
        return FrameStep::Resync;
    };

    let header_len = style.header_len();
    let Some(end) = header_len.checked_add(payload_len) else {
        return FrameStep::NeedMore;
    };
    if buf.len() < end {
        return FrameStep::NeedMore;
    }

    FrameStep::Frame(RawFrame {
        style,
        opcode,
        payload: &buf[header_len..end],
    })
}

/// Result of scanning a buffer.
#[derive(Debug)]
pub struct ScanOutput<M> {
    /// Successfully decoded messages, in stream order.
    pub messages: Vec<M>,
    /// Frames that were consumed but failed to decode.
    pub decode_errors: Vec<DecodeError>,
    /// Bytes occupied by complete frames.
    pub frame_bytes: usize,
    /// Bytes discarded while resynchronizing.
    pub resync_skipped: usize,
}

impl<M> ScanOutput<M> {
    /// Length of the prefix the caller must remove from its buffer.
    pub fn advance(&self) -> usize {
        self.frame_bytes + self.resync_skipped
    }

    /// Number of complete frames seen.
    pub fn frames(&self) -> usize {
        self.messages.len() + self.decode_errors.len()
    }
}

impl<M> Default for ScanOutput<M> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            decode_errors: Vec::new(),
            frame_bytes: 0,
            resync_skipped: 0,
        }
    }
}

/// Scan `buf` for complete frames, decoding each payload with `decode`.
///
/// Pure: the buffer is not modified. A decode failure still consumes its frame.
pub fn scan_with<M, F>(buf: &[u8], mut decode: F) -> ScanOutput<M>
where
    F: FnMut(&RawFrame<'_>) -> Result<M, DecodeError>,
{
    let mut out = ScanOutput::default();
    let mut pos = 0;

    loop {
        match next_frame(&buf[pos..]) {
            FrameStep::NeedMore => break,
            FrameStep::Resync => {
                pos += 1;
                out.resync_skipped += 1;
            }
            FrameStep::Frame(frame) => {
                match decode(&frame) {
                    Ok(msg) => out.messages.push(msg),
                    Err(e) => out.decode_errors.push(e),
                }
                pos += frame.wire_len();
                out.frame_bytes += frame.wire_len();
            }
        }
    }

    out
}

/// Scan `buf` for complete frames, decoding payloads with `codec`.
pub fn scan<C: MessageCodec>(buf: &[u8], codec: &C) -> ScanOutput<C::Up> {
    scan_with(buf, |frame| codec.decode(frame.payload))
}
