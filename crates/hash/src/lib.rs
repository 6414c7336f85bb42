#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! BLAKE3 content addressing for xfer
//!
//! Cache entries whose URL carries no usable file name are stored under a
//! 128-bit digest of the whole key, written as a canonical UUID.

use uuid::Uuid;

/// A BLAKE3 hash value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    bytes: [u8; 32],
}

impl Hash {
    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        Self {
            bytes: *blake3::hash(data).as_bytes(),
        }
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// The leading 128 bits of the digest in canonical UUID text form
    /// (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`).
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        let mut head = [0u8; 16];
        head.copy_from_slice(&self.bytes[..16]);
        Uuid::from_bytes(head)
    }
}

/// Stable 128-bit name for an arbitrary string key
#[must_use]
pub fn key_digest(key: &str) -> String {
    Hash::from_data(key.as_bytes())
        .to_uuid()
        .hyphenated()
        .to_string()
}
