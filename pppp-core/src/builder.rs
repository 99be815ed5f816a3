//! Outbound frame construction.
//!
//! Every builder is a pure function returning a ready-to-encrypt buffer.
//! The DRW sequence number is passed in by the caller; the session owns
//! the counter.
//!
//! ## Command body
//! ```text
//! magic:   [u8; 4]  06 0a a0 80
//! length:  u32 LE   length of the JSON body
//! body:    [u8]     JSON command object
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::message::MessageType;
use crate::packet::{DEVICE_MAGIC, DRW_SUBTYPE, HEADER_SIZE};

/// Sub-header opening every command body.
pub const COMMAND_MAGIC: [u8; 4] = [0x06, 0x0a, 0xa0, 0x80];

/// Length of the command sub-header (magic + LE32 length).
pub const COMMAND_HEADER_SIZE: usize = 8;

/// Wrap a JSON command body in the command sub-header.
pub fn command_frame(body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(COMMAND_HEADER_SIZE + body.len());
    buf.put_slice(&COMMAND_MAGIC);
    buf.put_u32_le(body.len() as u32);
    buf.put_slice(body);
    buf.freeze()
}

/// Build a DRW data frame on `channel` carrying `data`.
pub fn drw_frame(channel: u8, index: u16, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + data.len());
    buf.put_u8(DEVICE_MAGIC);
    buf.put_u8(MessageType::Drw as u8);
    buf.put_u16((data.len() + 4) as u16);
    buf.put_u8(DRW_SUBTYPE);
    buf.put_u8(channel);
    buf.put_u16(index);
    buf.put_slice(data);
    buf.freeze()
}

/// Reply to an ALIVE probe.
pub fn alive_ack_frame() -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u8(DEVICE_MAGIC);
    buf.put_u8(MessageType::AliveAck as u8);
    buf.put_u16(0);
    buf.freeze()
}

/// Acknowledge the DRW packet `index` received on `channel`.
pub fn drw_ack_frame(channel: u8, index: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(10);
    buf.put_u8(DEVICE_MAGIC);
    buf.put_u8(MessageType::DrwAck as u8);
    buf.put_u16(6);
    buf.put_u8(DRW_SUBTYPE);
    buf.put_u8(channel);
    // number of acknowledged indices that follow
    buf.put_u16(1);
    buf.put_u16(index);
    buf.freeze()
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    #[test]
    fn command_frame_layout() {
        let frame = command_frame(b"{\"a\":1}");
        assert_eq!(&frame[0..4], &COMMAND_MAGIC);
        assert_eq!(&frame[4..8], &7u32.to_le_bytes());
        assert_eq!(&frame[8..], b"{\"a\":1}");
    }

    #[test]
    fn drw_frame_layout() {
        let frame = drw_frame(0, 0x0102, &[9, 8, 7]);
        assert_eq!(
            &frame[..],
            &[0xf1, 0xd0, 0x00, 0x07, 0xd1, 0x00, 0x01, 0x02, 9, 8, 7]
        );
    }

    #[test]
    fn drw_frame_parses_back() {
        let cases: [(u8, u16, &[u8]); 4] = [
            (0, 0, b""),
            (1, 65535, b"jpeg"),
            (255, 1, &[0u8; 1000]),
            (1, 32768, &[0x55, 0xaa]),
        ];
        for (channel, index, payload) in cases {
            let pkt = Packet::parse(&drw_frame(channel, index, payload)).unwrap();
            assert_eq!(pkt.kind, Some(MessageType::Drw));
            assert_eq!(pkt.channel, channel);
            assert_eq!(pkt.index, index);
            assert_eq!(&pkt.payload[..], payload);
            assert_eq!(pkt.size as usize, payload.len() + 4);
        }
    }

    #[test]
    fn alive_ack_layout() {
        assert_eq!(&alive_ack_frame()[..], &[0xf1, 0xe1, 0x00, 0x00]);
    }

    #[test]
    fn drw_ack_layout() {
        assert_eq!(
            &drw_ack_frame(1, 0xbeef)[..],
            &[0xf1, 0xd1, 0x00, 0x06, 0xd1, 0x01, 0x00, 0x01, 0xbe, 0xef]
        );
    }
}
