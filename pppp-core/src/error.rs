//! Domain-specific error types for the PPPP protocol.
//!
//! All fallible operations return `Result<T, PpppError>`.
//! Malformed datagrams never panic; they surface as typed errors that the
//! session logs and drops.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the PPPP protocol.
#[derive(Debug, Error)]
pub enum PpppError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// The datagram is too short to carry even a message type byte.
    #[error("packet too short: {len} bytes (need at least 2)")]
    PacketTooShort { len: usize },

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A state transition or packet violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// No datagram has been received yet, so there is nobody to reply to.
    #[error("remote address not known yet")]
    NoRemoteAddress,

    /// The UDP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Serialization Errors ─────────────────────────────────────
    /// A JSON command body could not be encoded.
    #[error("json encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
