//! Configuration for the MJPEG bridge.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use pppp_core::{Credentials, PROBE_PORT, SessionConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Camera login and compatibility switches.
    pub camera: CameraConfig,
    /// Session timing and buffer sizes.
    pub session: SessionTuning,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the HTTP server listens on.
    pub http_addr: SocketAddr,
    /// Local UDP address for the camera session (port 0 = ephemeral).
    pub bind_addr: SocketAddr,
    /// Where discovery beacons are sent.
    pub broadcast_addr: SocketAddr,
}

/// Camera credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub user: String,
    pub password: String,
    pub device_mac: String,
    /// Send every DRW ack twice, for firmwares that lose acks.
    pub duplicate_drw_ack: bool,
}

/// Session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Handshake deadline in seconds.
    pub connect_timeout_secs: u64,
    /// Pause between discovery beacons in milliseconds.
    pub broadcast_interval_ms: u64,
    /// UDP read deadline in seconds.
    pub read_timeout_secs: u64,
    /// Frames buffered between the session and the HTTP fan-out.
    pub frame_queue_capacity: usize,
    /// Receive buffer per datagram, in bytes.
    pub recv_buffer_size: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            broadcast_addr: SocketAddr::from(([255, 255, 255, 255], PROBE_PORT)),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        let credentials = Credentials::default();
        Self {
            user: credentials.user,
            password: credentials.password,
            device_mac: credentials.device_mac,
            duplicate_drw_ack: false,
        }
    }
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            broadcast_interval_ms: 1000,
            read_timeout_secs: 5,
            frame_queue_capacity: 100,
            recv_buffer_size: 2048,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Convert into a `SessionConfig`. Zero values are raised to the
    /// smallest usable setting.
    pub fn to_session_config(&self) -> SessionConfig {
        let session = &self.session;
        SessionConfig {
            bind_addr: self.network.bind_addr,
            broadcast_addr: self.network.broadcast_addr,
            broadcast_interval: Duration::from_millis(session.broadcast_interval_ms.max(10)),
            connect_timeout: Duration::from_secs(session.connect_timeout_secs.max(1)),
            read_timeout: Duration::from_secs(session.read_timeout_secs.max(1)),
            recv_buffer_size: session.recv_buffer_size.max(pppp_core::HEADER_SIZE),
            frame_queue_capacity: session.frame_queue_capacity.max(1),
            duplicate_drw_ack: self.camera.duplicate_drw_ack,
            credentials: Credentials {
                user: self.camera.user.clone(),
                password: self.camera.password.clone(),
                device_mac: self.camera.device_mac.clone(),
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
