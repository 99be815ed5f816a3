//! PPPP packet parsing.
//!
//! ## Wire format
//!
//! All multi-byte integers are big-endian.
//!
//! ```text
//! magic:    u8   (1)  always 0xf1
//! type:     u8   (1)  see MessageType
//! size:     u16  (2)  payload + sub-header length (informational)
//! subtype:  u8   (1)  0xd1 for data frames
//! channel:  u8   (1)  0 = control, 1 = video
//! index:    u16  (2)  wraps at 65536
//! payload:  [u8] (variable)
//! ```

use std::fmt;

use bytes::Bytes;

use crate::error::PpppError;
use crate::message::MessageType;

// ── Constants ────────────────────────────────────────────────────

/// Length of the fixed packet header.
pub const HEADER_SIZE: usize = 8;

/// First byte of every packet sent to or received from a camera.
pub const DEVICE_MAGIC: u8 = 0xf1;

/// Sub-header byte (offset 4) of DRW data frames.
pub const DRW_SUBTYPE: u8 = 0xd1;

/// Channel carrying device commands and their responses.
pub const CONTROL_CHANNEL: u8 = 0;

/// Channel carrying JPEG video payloads.
pub const VIDEO_CHANNEL: u8 = 1;

/// Shortest buffer that still carries a type byte.
const MIN_PACKET_SIZE: usize = 2;

// ── Packet ───────────────────────────────────────────────────────

/// A parsed inbound packet.
///
/// `payload` is a zero-copy slice of the datagram it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw value of header byte 1, kept for logging unknown types.
    pub type_byte: u8,
    /// Resolved message type; `None` for bytes outside the dictionary.
    pub kind: Option<MessageType>,
    pub size: u16,
    pub channel: u8,
    pub index: u16,
    pub payload: Bytes,
}

impl Packet {
    /// Parse a decrypted datagram.
    ///
    /// Buffers of 2 to 7 bytes yield a degenerate packet that only carries
    /// the message type; every other field stays zero. Anything shorter
    /// than 2 bytes is rejected before any field is read.
    pub fn parse(buf: &Bytes) -> Result<Self, PpppError> {
        if buf.len() < MIN_PACKET_SIZE {
            return Err(PpppError::PacketTooShort { len: buf.len() });
        }

        let type_byte = buf[1];
        let kind = MessageType::try_from(type_byte).ok();

        if buf.len() < HEADER_SIZE {
            return Ok(Self {
                type_byte,
                kind,
                size: 0,
                channel: 0,
                index: 0,
                payload: Bytes::new(),
            });
        }

        Ok(Self {
            type_byte,
            kind,
            size: u16::from_be_bytes([buf[2], buf[3]]),
            channel: buf[5],
            index: u16::from_be_bytes([buf[6], buf[7]]),
            payload: buf.slice(HEADER_SIZE..),
        })
    }

    /// Whether this is a DRW packet on the video channel.
    pub fn is_video(&self) -> bool {
        self.kind == Some(MessageType::Drw) && self.channel == VIDEO_CHANNEL
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "Packet {{ type: {kind}")?,
            None => write!(f, "Packet {{ type: unknown({:#04x})", self.type_byte)?,
        }
        write!(
            f,
            ", size: {}, channel: {:#x}, index: {}, payload: {} bytes }}",
            self.size,
            self.channel,
            self.index,
            self.payload.len()
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────
