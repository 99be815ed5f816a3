//! The payload transform applied to every datagram.
//!
//! Cameras obfuscate each packet with a device-specific reversible byte
//! transform. The session treats it as opaque: outbound frames are
//! encrypted after construction, inbound datagrams are decrypted before
//! parsing. Punch echoes are the one exception and go back verbatim.

use bytes::Bytes;

/// A reversible per-datagram byte transform.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, data: &[u8]) -> Bytes;

    /// Must accept arbitrary input; the parser copes with garbage output.
    fn decrypt(&self, data: &[u8]) -> Bytes;
}

/// Identity transform, for firmwares that send packets in the clear
/// and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plaintext;

impl Cipher for Plaintext {
    fn encrypt(&self, data: &[u8]) -> Bytes {
        Bytes::copy_from_slice(data)
    }

    fn decrypt(&self, data: &[u8]) -> Bytes {
        Bytes::copy_from_slice(data)
    }
}
