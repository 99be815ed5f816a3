//! Video frame reassembly.
//!
//! The camera splits every JPEG into ~1 KB DRW packets on the video
//! channel. The first packet of a frame starts with [`FRAME_MARKER`]
//! followed by a 32-byte header; the rest are raw continuation bytes.
//! Packets arrive out of order, may be lost, and their 16-bit index wraps.
//!
//! A frame is emitted once the two most recent boundaries are known and
//! every index between them has arrived. Wraparound is treated as a hard
//! discontinuity: all state is dropped and collection starts over.

use std::collections::{BTreeSet, HashMap};

use bytes::{Bytes, BytesMut};

// ── Constants ────────────────────────────────────────────────────

/// Indices above this mark mean the counter is about to wrap.
pub const OVERFLOW_THRESHOLD: u16 = 65400;

/// Payload prefix of the first packet of every frame.
pub const FRAME_MARKER: [u8; 6] = [0x55, 0xaa, 0x15, 0xa8, 0x03, 0x00];

/// Bytes stripped from a boundary payload (marker + frame header).
pub const FRAME_HEADER_SIZE: usize = 0x20;

// ── VideoFrame ───────────────────────────────────────────────────

/// One complete frame, normally a JPEG image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub data: Bytes,
    /// Packet index of the boundary packet the frame started at.
    pub index: u16,
}

// ── ReassemblyStats ──────────────────────────────────────────────

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub frames_emitted: u64,
    /// Boundary pairs superseded by a newer boundary before completing.
    pub frames_dropped: u64,
    /// Full resets caused by index wraparound.
    pub wrap_resets: u64,
}

// ── Reassembler ──────────────────────────────────────────────────

/// Rebuilds ordered frames from video-channel packets.
#[derive(Debug, Default)]
pub struct Reassembler {
    overflow: bool,
    last_emitted: Option<u16>,
    boundaries: BTreeSet<u16>,
    received: HashMap<u16, Bytes>,
    stats: ReassemblyStats,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one packet; returns a frame if this packet completed one.
    pub fn ingest(&mut self, index: u16, payload: Bytes) -> Option<VideoFrame> {
        self.track_overflow(index);
        self.store(index, payload);

        if self.boundaries.len() > 1 {
            self.extract_frame()
        } else {
            None
        }
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    /// Number of payloads currently buffered.
    pub fn buffered(&self) -> usize {
        self.received.len()
    }

    /// Number of frame-start packets seen since the last emission.
    pub fn pending_boundaries(&self) -> usize {
        self.boundaries.len()
    }

    // ── Internal ─────────────────────────────────────────────────

    fn track_overflow(&mut self, index: u16) {
        if index > OVERFLOW_THRESHOLD {
            self.overflow = true;
        }

        if self.overflow && index < OVERFLOW_THRESHOLD {
            tracing::debug!(index, "video index wrapped, resetting reassembly state");
            self.reset();
        }
    }

    fn store(&mut self, index: u16, payload: Bytes) {
        if payload.starts_with(&FRAME_MARKER) {
            let body = payload.slice(FRAME_HEADER_SIZE.min(payload.len())..);
            self.received.insert(index, body);

            // The previous top pair can never be chosen again once a
            // newer boundary lands above it.
            if let Some((start, _)) = self.top_pair() {
                if index > start && self.last_emitted != Some(start) && !self.boundaries.contains(&index) {
                    self.stats.frames_dropped += 1;
                }
            }
            self.boundaries.insert(index);
        } else {
            self.received.insert(index, payload);
        }
    }

    fn extract_frame(&mut self) -> Option<VideoFrame> {
        let (start, end) = self.top_pair()?;

        if self.last_emitted == Some(start) {
            return None;
        }

        let data = self.build(start, end)?;
        self.last_emitted = Some(start);
        self.boundaries.clear();
        self.stats.frames_emitted += 1;

        Some(VideoFrame { data, index: start })
    }

    /// The two largest boundary indices, ascending.
    fn top_pair(&self) -> Option<(u16, u16)> {
        let mut iter = self.boundaries.iter().rev();
        let end = *iter.next()?;
        let start = *iter.next()?;
        Some((start, end))
    }

    /// Concatenate `[start, end)`; `None` if any index is missing.
    fn build(&self, start: u16, end: u16) -> Option<Bytes> {
        let mut frame = BytesMut::new();
        for i in start..end {
            let Some(part) = self.received.get(&i) else {
                tracing::trace!(start, end, missing = i, "frame incomplete");
                return None;
            };
            frame.extend_from_slice(part);
        }
        Some(frame.freeze())
    }

    fn reset(&mut self) {
        self.overflow = false;
        self.last_emitted = None;
        self.boundaries.clear();
        self.received.clear();
        self.stats.wrap_resets += 1;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary(tag: u8) -> Bytes {
        let mut data = FRAME_MARKER.to_vec();
        data.resize(FRAME_HEADER_SIZE, 0xee);
        data.extend_from_slice(&[tag, tag]);
        Bytes::from(data)
    }

    fn body(tag: u8) -> Bytes {
        Bytes::from(vec![tag; 3])
    }

    /// Payload for index `i`: boundaries at 10 and 20, bodies elsewhere.
    fn payload_for(i: u16) -> Bytes {
        if i == 10 || i == 20 {
            boundary(i as u8)
        } else {
            body(i as u8)
        }
    }

    fn expected_frame() -> Vec<u8> {
        let mut expected = vec![10u8, 10];
        for i in 11u8..20 {
            expected.extend_from_slice(&[i; 3]);
        }
        expected
    }

    #[test]
    fn boundary_header_is_stripped() {
        let mut r = Reassembler::new();
        assert!(r.ingest(10, boundary(1)).is_none());
        assert_eq!(r.pending_boundaries(), 1);
        assert_eq!(r.received.get(&10).unwrap(), &Bytes::from_static(&[1, 1]));
    }

    #[test]
    fn short_boundary_payload_is_empty() {
        let mut r = Reassembler::new();
        r.ingest(3, Bytes::from_static(&FRAME_MARKER));
        assert!(r.received.get(&3).unwrap().is_empty());
        assert_eq!(r.pending_boundaries(), 1);
    }

    #[test]
    fn in_order_frame() {
        let mut r = Reassembler::new();
        let mut frames = Vec::new();
        for i in 10..=20 {
            frames.extend(r.ingest(i, payload_for(i)));
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].index, 10);
        assert_eq!(&frames[0].data[..], &expected_frame()[..]);
        assert_eq!(r.stats().frames_emitted, 1);
        assert_eq!(r.pending_boundaries(), 0);
    }

    #[test]
    fn any_arrival_order_gives_one_frame() {
        let orders: [Vec<u16>; 3] = [
            (10..=20).rev().collect(),
            vec![20, 15, 10, 11, 19, 12, 18, 13, 17, 14, 16],
            vec![13, 20, 11, 12, 10, 14, 15, 16, 17, 18, 19],
        ];
        for order in orders {
            let mut r = Reassembler::new();
            let frames: Vec<_> = order
                .iter()
                .filter_map(|&i| r.ingest(i, payload_for(i)))
                .collect();
            assert_eq!(frames.len(), 1, "order {order:?}");
            assert_eq!(frames[0].index, 10);
            assert_eq!(&frames[0].data[..], &expected_frame()[..]);
        }
    }

    #[test]
    fn gap_prevents_emission() {
        let mut r = Reassembler::new();
        let frames: Vec<_> = (10..=20)
            .filter(|&i| i != 15)
            .filter_map(|i| r.ingest(i, payload_for(i)))
            .collect();
        assert!(frames.is_empty());
        assert_eq!(r.pending_boundaries(), 2);
    }

    #[test]
    fn late_packet_completes_frame() {
        let mut r = Reassembler::new();
        for i in (10..=20).filter(|&i| i != 15) {
            assert!(r.ingest(i, payload_for(i)).is_none());
        }
        let frame = r.ingest(15, payload_for(15)).unwrap();
        assert_eq!(frame.index, 10);
    }

    #[test]
    fn superseded_pair_counts_as_dropped() {
        let mut r = Reassembler::new();
        r.ingest(10, boundary(1));
        r.ingest(20, boundary(2));
        // 11..20 never arrive; a new frame starts at 30
        r.ingest(30, boundary(3));
        assert_eq!(r.stats().frames_dropped, 1);

        for i in 21..30 {
            r.ingest(i, body(0));
        }
        assert_eq!(r.stats().frames_emitted, 1);
    }

    #[test]
    fn in_order_delivery_emits_every_other_frame() {
        let mut r = Reassembler::new();
        let mut frames = Vec::new();
        for i in 0u16..=30 {
            let payload = if i % 10 == 0 { boundary(i as u8) } else { body(i as u8) };
            frames.extend(r.ingest(i, payload));
        }
        // Emitting clears every boundary, including the closing one, so
        // the frame starting at 10 has no opening boundary left.
        let indices: Vec<u16> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 20]);
        assert_eq!(r.stats().frames_emitted, 2);
        assert_eq!(r.pending_boundaries(), 0);
    }

    #[test]
    fn duplicate_pair_is_not_emitted_twice() {
        let mut r = Reassembler::new();
        for i in 10..=20 {
            r.ingest(i, payload_for(i));
        }
        // retransmitted boundaries of the already emitted pair
        assert!(r.ingest(10, payload_for(10)).is_none());
        assert!(r.ingest(20, payload_for(20)).is_none());
        assert_eq!(r.stats().frames_emitted, 1);
    }

    #[test]
    fn single_boundary_never_emits() {
        let mut r = Reassembler::new();
        assert!(r.ingest(1, boundary(1)).is_none());
        for i in 2..50 {
            assert!(r.ingest(i, body(1)).is_none());
        }
    }

    #[test]
    fn wraparound_resets_state() {
        let mut r = Reassembler::new();
        r.ingest(65390, boundary(1));
        r.ingest(65401, body(2));
        assert!(r.overflow);
        assert_eq!(r.buffered(), 2);

        r.ingest(5, body(3));
        assert!(!r.overflow);
        assert_eq!(r.pending_boundaries(), 0);
        assert_eq!(r.buffered(), 1);
        assert_eq!(r.received.get(&5).unwrap(), &body(3));
        assert_eq!(r.stats().wrap_resets, 1);
    }

    #[test]
    fn wraparound_reset_forgets_last_emitted() {
        let mut r = Reassembler::new();
        for i in 10..=20 {
            r.ingest(i, payload_for(i));
        }
        r.ingest(65500, body(0));
        r.ingest(0, body(0));
        assert_eq!(r.last_emitted, None);

        let mut frames = Vec::new();
        for i in 10..=20 {
            frames.extend(r.ingest(i, payload_for(i)));
        }
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn threshold_itself_does_not_reset() {
        let mut r = Reassembler::new();
        r.ingest(65401, body(1));
        r.ingest(OVERFLOW_THRESHOLD, body(2));
        assert!(r.overflow);
        assert_eq!(r.buffered(), 2);
    }
}
