//! Content-addressed hashing.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from parsing a hex-encoded hash.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte blake3 digest.
///
/// Hashes are carried as lowercase hex strings on the wire; the canonical
/// byte form is used everywhere internally.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// The all-zero hash, used as the previous-hash of the genesis block.
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// Hash arbitrary bytes.
    pub fn digest(data: &[u8]) -> Self {
        Hash(*blake3::hash(data).as_bytes())
    }

    /// Build from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex representation (wire form).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a lowercase or uppercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let bytes = hex::decode(s).map_err(|e| HexError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HexError::InvalidLength(bytes.len()))?;
        Ok(Hash(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "Hash({}..)", &self.to_hex()[..8])
    }
}

/// Incremental hasher over serialized fields.
///
/// Used by every hashed ledger type so the digest input is unambiguous:
/// each field is appended as its bincode encoding.
pub(crate) struct FieldHasher {
    inner: blake3::Hasher,
}

impl FieldHasher {
    pub fn new(domain_tag: &str) -> Self {
        let mut inner = blake3::Hasher::new();
        inner.update(domain_tag.as_bytes());
        FieldHasher { inner }
    }

    pub fn field<T: serde::Serialize>(mut self, value: &T) -> Self {
        let bytes = bincode::serialize(value).expect("in-memory serialization cannot fail");
        self.inner.update(&bytes);
        self
    }

    pub fn finish(self) -> Hash {
        Hash(*self.inner.finalize().as_bytes())
    }
}
