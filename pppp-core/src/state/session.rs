//! Session lifecycle state machine.
//!
//! Provides a `SessionPhase` enum that models the life of one camera
//! session, with validated transitions that return `Result` instead of
//! panicking.

use std::time::Instant;

use crate::error::PpppError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a camera session.
///
/// ```text
///  Idle ──► Discovering ──► Handshaking ──► Connected ──► Closed
///                │                │              │
///                └────────────────┴──────────────┴──► Failed
///                └──────────────────────────────────► Connected
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Created, socket not bound yet.
    #[default]
    Idle,

    /// Broadcasting discovery beacons, no punch seen yet.
    Discovering,

    /// At least one punch received and echoed; waiting for P2P-ready.
    Handshaking,

    /// Device reported P2P-ready; commands and video may flow.
    Connected {
        /// When the session entered the `Connected` state.
        since: Instant,
    },

    /// Closed by the owner. Terminal.
    Closed,

    /// The handshake did not finish in time. Terminal.
    Failed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Discovering => write!(f, "Discovering"),
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Closed => write!(f, "Closed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl SessionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` for `Closed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// How long the session has been `Connected`; `None` otherwise.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Discovering`.
    ///
    /// Valid from: `Idle`.
    pub fn begin_discovery(&mut self) -> Result<(), PpppError> {
        match self {
            Self::Idle => {
                *self = Self::Discovering;
                Ok(())
            }
            _ => Err(PpppError::ProtocolViolation(
                "cannot discover: not in Idle state",
            )),
        }
    }

    /// Transition to `Handshaking` after the first punch.
    ///
    /// Valid from: `Discovering`.
    pub fn begin_handshake(&mut self) -> Result<(), PpppError> {
        match self {
            Self::Discovering => {
                *self = Self::Handshaking;
                Ok(())
            }
            _ => Err(PpppError::ProtocolViolation(
                "cannot handshake: not in Discovering state",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Discovering` (ready without a punch), `Handshaking`.
    pub fn complete_handshake(&mut self) -> Result<(), PpppError> {
        match self {
            Self::Discovering | Self::Handshaking => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(PpppError::ProtocolViolation(
                "cannot complete handshake: not discovering or handshaking",
            )),
        }
    }

    /// Transition to `Failed`.
    ///
    /// Valid from any non-terminal phase.
    pub fn fail(&mut self) -> Result<(), PpppError> {
        if self.is_terminal() {
            return Err(PpppError::ProtocolViolation(
                "cannot fail: session already terminated",
            ));
        }
        *self = Self::Failed;
        Ok(())
    }

    /// Mark the session closed. `Failed` is kept so the cause stays
    /// visible; closing twice is a no-op.
    pub fn close(&mut self) {
        if !matches!(self, Self::Failed) {
            *self = Self::Closed;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
