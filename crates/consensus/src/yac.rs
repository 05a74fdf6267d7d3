//! The YAC state machine.

use crate::cluster::ClusterOrdering;
use crate::storage::{RoundOutcome, YacVoteStorage};
use crate::supermajority::{ConsistencyModel, SupermajorityChecker};
use meridian_core::{Action, ConsensusOutcome, OutboundMessage, TimerId};
use meridian_messages::VoteState;
use meridian_types::{KeyPair, Peer, Round, VoteMessage, YacHash};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// YAC configuration.
#[derive(Debug, Clone)]
pub struct YacConfig {
    /// Delay before re-broadcasting the own vote.
    pub vote_delay: Duration,
    /// Supermajority model.
    pub consistency_model: ConsistencyModel,
    /// How many past rounds of votes to retain.
    pub storage_window: usize,
}

impl Default for YacConfig {
    fn default() -> Self {
        YacConfig {
            vote_delay: Duration::from_millis(3000),
            consistency_model: ConsistencyModel::Bft,
            storage_window: 8,
        }
    }
}

/// Vote collection and outcome emission for consensus rounds.
///
/// All handlers are synchronous and return the I/O to perform. One timer
/// (`TimerId::VoteDelay`) re-broadcasts the own vote until the round
/// decides.
pub struct YacState {
    keypair: KeyPair,
    checker: SupermajorityChecker,
    vote_delay: Duration,
    storage: YacVoteStorage,
    /// The round this node is currently voting in.
    round: Round,
    /// Peer order for the current round; also the vote-validity peer list.
    cluster: Option<ClusterOrdering>,
    /// Our vote for the current round, re-sent on timer expiry.
    own_vote: Option<VoteMessage>,
}

impl YacState {
    pub fn new(keypair: KeyPair, config: YacConfig) -> Self {
        YacState {
            keypair,
            checker: SupermajorityChecker::new(config.consistency_model),
            vote_delay: config.vote_delay,
            storage: YacVoteStorage::new(config.storage_window),
            round: Round::default(),
            cluster: None,
            own_vote: None,
        }
    }

    /// Vote for `hash` in its round, using `order` as the peer cluster.
    ///
    /// Signs the vote, sends it to every peer in order, and arms the
    /// re-propagation timer.
    #[instrument(skip_all, fields(round = %hash.round))]
    pub fn vote(&mut self, hash: YacHash, order: ClusterOrdering) -> Vec<Action> {
        info!(round = %hash.round, block = %hash.block_hash, "Voting");
        self.round = hash.round;
        self.own_vote = Some(VoteMessage::sign(hash, &self.keypair));
        self.cluster = Some(order);
        self.storage.cleanup();

        let vote = self.own_vote.expect("own vote was just set");
        let mut actions = self.propagate_state(vec![vote]);
        actions.push(Action::SetTimer {
            id: TimerId::VoteDelay,
            duration: self.vote_delay,
        });

        // Our own vote may already complete the round (single-peer
        // cluster).
        self.storage.insert(vote);
        actions.extend(self.try_decide(self.round));
        actions
    }

    /// Handle an incoming vote state.
    #[instrument(skip_all, fields(votes = votes.len()))]
    pub fn on_state(&mut self, votes: Vec<VoteMessage>) -> Vec<Action> {
        let Some(round) = Self::common_round(&votes) else {
            warn!("Malformed vote state dropped");
            return vec![];
        };

        let verified: Vec<VoteMessage> = votes
            .into_iter()
            .filter(|vote| match vote.verify() {
                Ok(()) => true,
                Err(err) => {
                    warn!(%err, peer = %vote.public_key, "Bad vote signature dropped");
                    false
                }
            })
            .collect();
        if verified.is_empty() {
            return vec![];
        }

        if round > self.round {
            return self.on_future_state(round, verified);
        }
        if round < self.round {
            return self.answer_laggard(round, &verified);
        }
        self.apply_state(round, verified)
    }

    /// The re-propagation timer fired: send the own vote again.
    pub fn on_vote_timer(&mut self) -> Vec<Action> {
        if self.storage.outcome(self.round).is_some() {
            return vec![];
        }
        let Some(vote) = self.own_vote else {
            return vec![];
        };
        debug!(round = %self.round, "Re-propagating own vote");
        let mut actions = self.propagate_state(vec![vote]);
        actions.push(Action::SetTimer {
            id: TimerId::VoteDelay,
            duration: self.vote_delay,
        });
        actions
    }

    fn apply_state(&mut self, round: Round, votes: Vec<VoteMessage>) -> Vec<Action> {
        // Terminal rounds ignore further state silently.
        if self.storage.outcome(round).is_some() {
            debug!(%round, "Round already decided, state dropped");
            return vec![];
        }

        for vote in votes {
            if !self.is_known_peer(&vote) {
                warn!(peer = %vote.public_key, "Vote from unknown peer dropped");
                continue;
            }
            self.storage.insert(vote);
        }
        self.try_decide(round)
    }

    fn try_decide(&mut self, round: Round) -> Vec<Action> {
        if self.storage.outcome(round).is_some() {
            return vec![];
        }
        let total = self.cluster.as_ref().map(|c| c.size() as u64).unwrap_or(0);
        let Some(outcome) = self.storage.compute(round, &self.checker, total) else {
            return vec![];
        };

        self.storage.set_outcome(round, outcome.clone());
        let consensus_outcome = match outcome {
            RoundOutcome::Commit { block_hash, votes } => {
                info!(%round, %block_hash, "Commit");
                ConsensusOutcome::Commit {
                    round,
                    block_hash,
                    votes,
                }
            }
            RoundOutcome::Reject => {
                info!(%round, "Reject");
                ConsensusOutcome::Reject { round }
            }
            RoundOutcome::FutureSignalled => return vec![],
        };

        vec![
            Action::CancelTimer {
                id: TimerId::VoteDelay,
            },
            Action::EmitOutcome {
                outcome: consensus_outcome,
            },
        ]
    }

    /// A vote arrived for a round ahead of ours: store it and signal the
    /// synchronizer, once per round.
    fn on_future_state(&mut self, round: Round, votes: Vec<VoteMessage>) -> Vec<Action> {
        for vote in votes {
            self.storage.insert(vote);
        }
        if self.storage.outcome(round).is_some() {
            return vec![];
        }
        self.storage
            .set_outcome(round, RoundOutcome::FutureSignalled);
        info!(%round, current = %self.round, "Vote from future round, synchronization needed");
        vec![Action::EmitOutcome {
            outcome: ConsensusOutcome::Future { round },
        }]
    }

    /// A vote arrived for a past round: send the round's commit certificate
    /// back to the laggard, when we have one.
    fn answer_laggard(&mut self, round: Round, votes: &[VoteMessage]) -> Vec<Action> {
        let Some(RoundOutcome::Commit {
            votes: certificate, ..
        }) = self.storage.outcome(round)
        else {
            debug!(%round, "No stored outcome for past round, state dropped");
            return vec![];
        };
        debug!(%round, "Answering laggard with stored commit");
        let message = OutboundMessage::VoteState(VoteState {
            votes: certificate.clone(),
        });
        votes
            .iter()
            .map(|vote| Action::Send {
                to: vote.public_key.to_hex(),
                message: message.clone(),
            })
            .collect()
    }

    fn propagate_state(&self, votes: Vec<VoteMessage>) -> Vec<Action> {
        let Some(cluster) = &self.cluster else {
            return vec![];
        };
        let message = OutboundMessage::VoteState(VoteState { votes });
        cluster
            .peers()
            .iter()
            .map(|peer: &Peer| Action::Send {
                to: peer.public_key.clone(),
                message: message.clone(),
            })
            .collect()
    }

    fn is_known_peer(&self, vote: &VoteMessage) -> bool {
        let key = vote.public_key.to_hex();
        self.cluster
            .as_ref()
            .map(|c| c.peers().iter().any(|p| p.public_key == key))
            .unwrap_or(false)
    }

    fn common_round(votes: &[VoteMessage]) -> Option<Round> {
        let first = votes.first()?.hash.round;
        votes
            .iter()
            .all(|v| v.hash.round == first)
            .then_some(first)
    }

    pub fn current_round(&self) -> Round {
        self.round
    }
}
