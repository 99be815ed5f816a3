//! `multipart/x-mixed-replace` framing for JPEG frames.

use bytes::{BufMut, Bytes, BytesMut};
use pppp_core::VideoFrame;

/// Multipart boundary token.
pub const BOUNDARY: &str = "FRAMEBOUNDARY";

/// `Content-Type` header value for the stream response.
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=FRAMEBOUNDARY";

/// Encode one frame as a multipart part, trailing CRLF included.
pub fn encode_part(frame: &VideoFrame) -> Bytes {
    let header = format!(
        "--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        frame.data.len()
    );

    let mut buf = BytesMut::with_capacity(header.len() + frame.data.len() + 2);
    buf.put_slice(header.as_bytes());
    buf.put_slice(&frame.data);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_names_boundary() {
        assert!(CONTENT_TYPE.starts_with("multipart/x-mixed-replace"));
        assert!(CONTENT_TYPE.ends_with(&format!("boundary={BOUNDARY}")));
    }

    #[test]
    fn part_layout() {
        let frame = VideoFrame {
            data: Bytes::from_static(b"\xff\xd8JPEG\xff\xd9"),
            index: 10,
        };
        let part = encode_part(&frame);

        let expected: &[u8] = b"--FRAMEBOUNDARY\r\n\
            Content-Type: image/jpeg\r\n\
            Content-Length: 8\r\n\
            \r\n\
            \xff\xd8JPEG\xff\xd9\r\n";
        assert_eq!(&part[..], expected);
    }

    #[test]
    fn empty_frame_still_framed() {
        let frame = VideoFrame {
            data: Bytes::new(),
            index: 0,
        };
        let part = encode_part(&frame);
        assert!(part.starts_with(b"--FRAMEBOUNDARY\r\n"));
        assert!(part.ends_with(b"Content-Length: 0\r\n\r\n\r\n"));
    }
}
