//! # pppp-server: PPPP camera MJPEG bridge
//!
//! Connects to a camera over PPPP, asks it to start streaming, and
//! re-serves the reassembled JPEG frames to any number of HTTP clients
//! as a `multipart/x-mixed-replace` stream.
//!
//! ## Endpoints
//!
//! - **`GET /stream`**: the live MJPEG stream.
//! - Anything else answers `404`.

pub mod config;
pub mod mjpeg;
pub mod service;
