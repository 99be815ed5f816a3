//! # pppp-core
//!
//! Core protocol library for PPPP, the UDP peer-to-peer protocol spoken
//! by low-cost network cameras.
//!
//! This crate contains:
//! - **Codec**: `Packet` parsing and `MessageType` for the 8-byte header format
//! - **Builders**: command, DRW, DRW-ack and alive-ack frames
//! - **Commands**: the JSON `StreamRequest` carried on the control channel
//! - **Video**: `Reassembler` that rebuilds JPEG frames from indexed packets
//! - **State**: `SessionPhase` lifecycle and the one-shot `ReadySignal`
//! - **Network**: `Session` for discovery, punch handshake, keep-alive and dispatch
//! - **Cipher**: the `Cipher` trait for the device-specific payload transform
//! - **Error**: `PpppError`, the `thiserror`-based error enum

pub mod builder;
pub mod cipher;
pub mod command;
pub mod error;
pub mod message;
pub mod network;
pub mod packet;
pub mod signal;
pub mod state;
pub mod video;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use cipher::{Cipher, Plaintext};
pub use command::{Credentials, StreamRequest};
pub use error::PpppError;
pub use message::MessageType;
pub use network::{DISCOVERY_BEACON, PROBE_PORT, Session, SessionConfig};
pub use packet::{CONTROL_CHANNEL, DEVICE_MAGIC, HEADER_SIZE, Packet, VIDEO_CHANNEL};
pub use signal::ReadySignal;
pub use state::SessionPhase;
pub use video::{ReassemblyStats, Reassembler, VideoFrame};
