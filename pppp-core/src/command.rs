//! JSON device commands carried on the control channel.
//!
//! Commands travel as `DRW(channel 0) → command sub-header → JSON`.
//! Only the stream request is needed to start video.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::builder::command_frame;
use crate::error::PpppError;

/// Command code asking the camera to start streaming.
pub const CMD_START_STREAM: u32 = 111;

// ── Credentials ──────────────────────────────────────────────────

/// Login fields every command carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    /// Device identifier; most firmwares accept the placeholder `0000`.
    pub device_mac: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            user: "admin".into(),
            password: "6666".into(),
            device_mac: "0000".into(),
        }
    }
}

// ── StreamRequest ────────────────────────────────────────────────

/// Request to start the video stream.
///
/// Field order matches the bytes deployed cameras expect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamRequest {
    pub cmd: u32,
    pub devmac: String,
    /// Protocol marker, always `"stream"`.
    pub pro: String,
    pub pwd: String,
    pub user: String,
    pub video: u8,
}

impl StreamRequest {
    /// Build a start-stream request for the given credentials.
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            cmd: CMD_START_STREAM,
            devmac: credentials.device_mac.clone(),
            pro: "stream".into(),
            pwd: credentials.password.clone(),
            user: credentials.user.clone(),
            video: 1,
        }
    }

    /// Serialize to JSON and wrap in the command sub-header.
    pub fn to_command_frame(&self) -> Result<Bytes, PpppError> {
        let body = serde_json::to_vec(self)?;
        Ok(command_frame(&body))
    }
}
