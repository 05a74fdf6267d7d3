//! Peers and ledger state.

use crate::Hash;
use serde::{Deserialize, Serialize};

/// A network peer as recorded in the WSV.
///
/// The public key is kept as its lowercase hex form, matching the storage
/// key layout and the wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub public_key: String,
    pub address: String,
    pub tls_certificate: Option<String>,
}

impl Peer {
    pub fn new(public_key: impl Into<String>, address: impl Into<String>) -> Self {
        Peer {
            public_key: public_key.into().to_lowercase(),
            address: address.into(),
            tls_certificate: None,
        }
    }
}

/// Post-state summary of the highest committed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub height: u64,
    pub top_block_hash: Hash,
    pub peers: Vec<Peer>,
}

impl LedgerState {
    /// State of an empty ledger (no blocks committed yet).
    pub fn genesis(peers: Vec<Peer>) -> Self {
        LedgerState {
            height: 0,
            top_block_hash: Hash::ZERO,
            peers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_key_is_lowercased() {
        let peer = Peer::new("ABCDEF", "127.0.0.1:10001");
        assert_eq!(peer.public_key, "abcdef");
    }
}
