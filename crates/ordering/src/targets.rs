//! Per-round ordering peer selection.
//!
//! The ordering peer for a round is drawn from a permutation of the ledger
//! peer list. The permutation for the current height is seeded by the
//! previous block's hash, the one for the next height by the top block's
//! hash. All peers derive the same permutations, so everyone agrees on who
//! orders which round.

use meridian_types::{generate_permutation, Hash, Peer, Round, Seeder};
use crate::common::{next_commit_round, next_reject_round};

/// The three peers a node talks to for one round.
///
/// ```text
///    0 1         0 1         0 1
///  0 o .       0 o x       0 o .
///  1 . .       1 . .       1 x .
/// Issuer      Reject      Commit
/// ```
///
/// Batches go to all three (the round's issuer plus the issuers of both
/// possible next rounds); proposal requests go to the issuer only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTargets {
    pub issuer: Peer,
    pub reject_consumer: Peer,
    pub commit_consumer: Peer,
}

impl RoundTargets {
    /// Compute the targets for `round` from the peer list.
    ///
    /// `previous_hash` is the hash of the block before the top block;
    /// `current_hash` is the top block's hash. Returns `None` for an empty
    /// peer list.
    pub fn compute(
        previous_hash: &Hash,
        current_hash: &Hash,
        peers: &[Peer],
        round: Round,
    ) -> Option<RoundTargets> {
        if peers.is_empty() {
            return None;
        }

        let mut current_permutation = Vec::new();
        generate_permutation(
            &mut current_permutation,
            Seeder::new().feed(previous_hash.as_bytes()).make_prng(),
            peers.len(),
        );
        let mut next_permutation = Vec::new();
        generate_permutation(
            &mut next_permutation,
            Seeder::new().feed(current_hash.as_bytes()).make_prng(),
            peers.len(),
        );

        // The reject round can exceed the number of peers; wrap it.
        let pick = |permutation: &[usize], reject_round: u32| -> Peer {
            peers[permutation[reject_round as usize % permutation.len()]].clone()
        };

        Some(RoundTargets {
            issuer: pick(&current_permutation, round.reject_round),
            reject_consumer: pick(&current_permutation, next_reject_round(round).reject_round),
            commit_consumer: pick(&next_permutation, next_commit_round(round).reject_round),
        })
    }

    /// The distinct peer ids among the three targets, issuer first.
    pub fn distinct_peer_ids(&self) -> Vec<String> {
        let mut ids = vec![self.issuer.public_key.clone()];
        for peer in [&self.reject_consumer, &self.commit_consumer] {
            if !ids.contains(&peer.public_key) {
                ids.push(peer.public_key.clone());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(n: usize) -> Vec<Peer> {
        (0..n)
            .map(|i| Peer::new(format!("pk{i}"), format!("127.0.0.1:{}", 10000 + i)))
            .collect()
    }

    #[test]
    fn deterministic_for_same_hashes() {
        let peers = peers(5);
        let prev = Hash::digest(b"prev");
        let top = Hash::digest(b"top");
        let a = RoundTargets::compute(&prev, &top, &peers, Round::new(6, 1)).unwrap();
        let b = RoundTargets::compute(&prev, &top, &peers, Round::new(6, 1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reject_round_can_pick_a_different_issuer() {
        let peers = peers(7);
        let prev = Hash::digest(b"prev");
        let top = Hash::digest(b"top");
        // Issuers across consecutive reject rounds follow the permutation,
        // so somewhere within the wrap range they must differ.
        let issuers: Vec<String> = (0..7)
            .map(|r| {
                RoundTargets::compute(&prev, &top, &peers, Round::new(6, r))
                    .unwrap()
                    .issuer
                    .public_key
            })
            .collect();
        assert!(issuers.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn empty_peer_list_yields_none() {
        assert!(RoundTargets::compute(
            &Hash::ZERO,
            &Hash::ZERO,
            &[],
            Round::new(1, 0)
        )
        .is_none());
    }

    #[test]
    fn single_peer_gets_all_roles() {
        let peers = peers(1);
        let targets =
            RoundTargets::compute(&Hash::ZERO, &Hash::ZERO, &peers, Round::new(2, 0)).unwrap();
        assert_eq!(targets.distinct_peer_ids(), vec!["pk0".to_owned()]);
    }
}
