//! Per-round vote storage.

use crate::supermajority::SupermajorityChecker;
use meridian_types::{Hash, PublicKey, Round, VoteMessage};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Terminal outcome recorded for a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Commit {
        block_hash: Hash,
        /// The votes forming the commit certificate.
        votes: Vec<VoteMessage>,
    },
    Reject,
    /// A synchronization hint was already emitted for this future round.
    FutureSignalled,
}

#[derive(Debug, Default)]
struct RoundStorage {
    /// One vote per peer per round; the first vote wins.
    votes_by_peer: HashMap<PublicKey, VoteMessage>,
    outcome: Option<RoundOutcome>,
}

impl RoundStorage {
    /// Count votes per `(proposal_hash, block_hash)` candidate.
    fn tally(&self) -> HashMap<(Hash, Hash), Vec<&VoteMessage>> {
        let mut tally: HashMap<(Hash, Hash), Vec<&VoteMessage>> = HashMap::new();
        for vote in self.votes_by_peer.values() {
            tally
                .entry((vote.hash.proposal_hash, vote.hash.block_hash))
                .or_default()
                .push(vote);
        }
        tally
    }
}

/// Vote storage across rounds with a bounded cleanup window.
#[derive(Debug)]
pub struct YacVoteStorage {
    rounds: BTreeMap<Round, RoundStorage>,
    /// How many past rounds to retain.
    window: usize,
}

impl YacVoteStorage {
    pub fn new(window: usize) -> Self {
        YacVoteStorage {
            rounds: BTreeMap::new(),
            window,
        }
    }

    /// Insert a vote; returns false when the peer already voted this round.
    pub fn insert(&mut self, vote: VoteMessage) -> bool {
        let storage = self.rounds.entry(vote.hash.round).or_default();
        match storage.votes_by_peer.entry(vote.public_key) {
            std::collections::hash_map::Entry::Occupied(_) => {
                debug!(round = %vote.hash.round, peer = %vote.public_key, "Duplicate vote dropped");
                false
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(vote);
                true
            }
        }
    }

    /// Number of distinct voters in a round.
    pub fn voted(&self, round: Round) -> u64 {
        self.rounds
            .get(&round)
            .map(|s| s.votes_by_peer.len() as u64)
            .unwrap_or(0)
    }

    /// Compute the round's outcome, if the collected votes decide it.
    ///
    /// Returns `None` while the round is still open. Does not record the
    /// outcome; the caller does that via [`Self::set_outcome`].
    pub fn compute(
        &self,
        round: Round,
        checker: &SupermajorityChecker,
        total_peers: u64,
    ) -> Option<RoundOutcome> {
        let storage = self.rounds.get(&round)?;
        let tally = storage.tally();

        let mut frequent = 0u64;
        for (key, votes) in &tally {
            let weight = votes.len() as u64;
            if checker.has_supermajority(weight, total_peers) {
                return Some(RoundOutcome::Commit {
                    block_hash: key.1,
                    votes: votes.iter().map(|v| **v).collect(),
                });
            }
            frequent = frequent.max(weight);
        }

        let voted = storage.votes_by_peer.len() as u64;
        if checker.has_reject(frequent, voted, total_peers) {
            return Some(RoundOutcome::Reject);
        }
        None
    }

    /// The recorded outcome of a round, if decided.
    pub fn outcome(&self, round: Round) -> Option<&RoundOutcome> {
        self.rounds.get(&round).and_then(|s| s.outcome.as_ref())
    }

    /// Record a round's terminal outcome.
    pub fn set_outcome(&mut self, round: Round, outcome: RoundOutcome) {
        self.rounds.entry(round).or_default().outcome = Some(outcome);
    }

    /// Trim storage to the most recent `window` rounds.
    pub fn cleanup(&mut self) {
        while self.rounds.len() > self.window {
            let oldest = *self
                .rounds
                .keys()
                .next()
                .expect("non-empty map has a first key");
            self.rounds.remove(&oldest);
            debug!(round = %oldest, "Pruned round storage");
        }
    }

    pub fn known_rounds(&self) -> usize {
        self.rounds.len()
    }
}
