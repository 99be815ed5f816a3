//! Protocol message types.
//!
//! Uses a proper enum with `TryFrom`; unknown type bytes are an error
//! value, never a panic.

use crate::error::PpppError;
use std::fmt;

// ── MessageType ──────────────────────────────────────────────────

/// Every message type the PPPP header (byte 1) can carry.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// NAT punch probe, echoed back verbatim.
    Punch = 0x41,
    /// Device signals that the peer-to-peer path is up.
    P2pReady = 0x42,
    /// Data write: commands on channel 0, video on channel 1.
    Drw = 0xd0,
    /// Acknowledgement of a DRW packet.
    DrwAck = 0xd1,
    /// Keep-alive probe.
    Alive = 0xe0,
    /// Keep-alive reply.
    AliveAck = 0xe1,
    /// Session teardown.
    Close = 0xf0,
}

impl TryFrom<u8> for MessageType {
    type Error = PpppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x41 => Ok(MessageType::Punch),
            0x42 => Ok(MessageType::P2pReady),
            0xd0 => Ok(MessageType::Drw),
            0xd1 => Ok(MessageType::DrwAck),
            0xe0 => Ok(MessageType::Alive),
            0xe1 => Ok(MessageType::AliveAck),
            0xf0 => Ok(MessageType::Close),
            _ => Err(PpppError::UnknownVariant {
                type_name: "MessageType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Punch => "MSG_PUNCH",
            MessageType::P2pReady => "MSG_P2P_RDY",
            MessageType::Drw => "MSG_DRW",
            MessageType::DrwAck => "MSG_DRW_ACK",
            MessageType::Alive => "MSG_ALIVE",
            MessageType::AliveAck => "MSG_ALIVE_ACK",
            MessageType::Close => "MSG_CLOSE",
        };
        f.write_str(name)
    }
}
