//! Cluster ordering: deterministic per-round peer order.

use meridian_types::{generate_permutation, Peer, Seeder, YacHash};
use tracing::debug;

/// An ordered view of the peer cluster for one round.
///
/// The leader rotates through the order on timeouts; the order itself comes
/// from [`PeerOrderer`] and is identical on every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOrdering {
    order: Vec<Peer>,
    current: usize,
}

impl ClusterOrdering {
    /// Identity ordering. `None` for an empty peer list.
    pub fn new(peers: Vec<Peer>) -> Option<Self> {
        if peers.is_empty() {
            return None;
        }
        Some(ClusterOrdering {
            order: peers,
            current: 0,
        })
    }

    /// Ordering given by `permutation` over `peers`.
    pub fn with_permutation(peers: &[Peer], permutation: &[usize]) -> Option<Self> {
        if peers.is_empty() || permutation.len() != peers.len() {
            return None;
        }
        Some(ClusterOrdering {
            order: permutation.iter().map(|&i| peers[i].clone()).collect(),
            current: 0,
        })
    }

    /// The peer currently leading the round.
    pub fn current_leader(&self) -> &Peer {
        &self.order[self.current]
    }

    /// Rotate to the next peer, wrapping around.
    pub fn switch_to_next(&mut self) {
        self.current = (self.current + 1) % self.order.len();
    }

    pub fn peers(&self) -> &[Peer] {
        &self.order
    }

    pub fn size(&self) -> usize {
        self.order.len()
    }
}

/// Derives the cluster ordering for a round from the voted block hash.
///
/// The permutation seed is part of the wire protocol: every node must
/// compute the same order from the same hash.
pub struct PeerOrderer;

impl PeerOrderer {
    pub fn get_ordering(hash: &YacHash, peers: &[Peer]) -> Option<ClusterOrdering> {
        let mut permutation = Vec::new();
        generate_permutation(
            &mut permutation,
            Seeder::new().feed(hash.block_hash.as_bytes()).make_prng(),
            peers.len(),
        );
        debug!(?permutation, "Cluster ordering computed");
        ClusterOrdering::with_permutation(peers, &permutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::{Hash, Round};

    fn peers(n: usize) -> Vec<Peer> {
        (0..n)
            .map(|i| Peer::new(format!("pk{i}"), format!("127.0.0.1:{}", 10000 + i)))
            .collect()
    }

    fn yac_hash(block: &[u8]) -> YacHash {
        YacHash::new(Round::new(1, 0), Hash::digest(b"p"), Hash::digest(block))
    }

    #[test]
    fn ordering_is_deterministic_per_hash() {
        let peers = peers(6);
        let a = PeerOrderer::get_ordering(&yac_hash(b"block"), &peers).unwrap();
        let b = PeerOrderer::get_ordering(&yac_hash(b"block"), &peers).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_hashes_generally_reorder() {
        let peers = peers(8);
        let a = PeerOrderer::get_ordering(&yac_hash(b"one"), &peers).unwrap();
        let b = PeerOrderer::get_ordering(&yac_hash(b"two"), &peers).unwrap();
        assert_ne!(a.peers(), b.peers());
    }

    #[test]
    fn rotation_wraps() {
        let mut order = ClusterOrdering::new(peers(2)).unwrap();
        let first = order.current_leader().clone();
        order.switch_to_next();
        assert_ne!(order.current_leader(), &first);
        order.switch_to_next();
        assert_eq!(order.current_leader(), &first);
    }

    #[test]
    fn empty_cluster_has_no_ordering() {
        assert!(ClusterOrdering::new(vec![]).is_none());
        assert!(PeerOrderer::get_ordering(&yac_hash(b"x"), &[]).is_none());
    }
}
