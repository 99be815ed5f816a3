//! UDP networking: the camera session and its background tasks.

pub mod session;

pub use session::{DISCOVERY_BEACON, PROBE_PORT, Session, SessionConfig};
