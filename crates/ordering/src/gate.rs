//! The ordering gate.
//!
//! Per-node driver of the ordering plane: forwards batches to the round's
//! ordering peers, requests a proposal on every round switch, and strips
//! replays and duplicates from incoming proposals before they reach
//! consensus.

use crate::service::OnDemandOrderingService;
use crate::targets::RoundTargets;
use meridian_core::{
    Action, OrderingEvent, OutboundMessage, RoundSwitch, TxPresenceCache, TxStatus,
};
use meridian_messages::{BatchesNotification, ProposalRequest, ProposalResponse};
use meridian_types::{Batch, Block, Hash, LedgerState, Proposal, Round};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

struct GateState {
    stopped: bool,
    current_round: Round,
    ledger_state: Option<LedgerState>,
    targets: Option<RoundTargets>,
    /// Hash of the block before the top block; seeds the current-height
    /// permutation.
    previous_hash: Hash,
    /// Top block hash; seeds the next-height permutation.
    current_hash: Hash,
    /// Round whose proposal response was already handed to consensus; a
    /// late timeout response for the same round is dropped.
    responded_round: Option<Round>,
}

/// Requests proposals from the ordering service, forwards batches, and
/// passes stripped proposals to the consensus pipeline.
///
/// `stop()` is guarded by the state lock: in-flight operations finish, and
/// every later call short-circuits to a no-op.
pub struct OrderingGate {
    ordering_service: Arc<OnDemandOrderingService>,
    tx_cache: Arc<dyn TxPresenceCache>,
    state: RwLock<GateState>,
}

impl OrderingGate {
    pub fn new(
        ordering_service: Arc<OnDemandOrderingService>,
        tx_cache: Arc<dyn TxPresenceCache>,
    ) -> Self {
        OrderingGate {
            ordering_service,
            tx_cache,
            state: RwLock::new(GateState {
                stopped: false,
                current_round: Round::default(),
                ledger_state: None,
                targets: None,
                previous_hash: Hash::ZERO,
                current_hash: Hash::ZERO,
                responded_round: None,
            }),
        }
    }

    /// Forward a batch to the local service and to the round's peers.
    #[instrument(skip_all, fields(batch = %batch.hash()))]
    pub fn propagate_batch(&self, batch: Batch) -> Vec<Action> {
        let state = self.state.read();
        if state.stopped {
            return vec![];
        }

        self.ordering_service.on_batches(vec![batch.clone()]);

        let Some(targets) = &state.targets else {
            debug!("No round targets yet, batch kept locally");
            return vec![];
        };
        targets
            .distinct_peer_ids()
            .into_iter()
            .map(|to| Action::Send {
                to,
                message: OutboundMessage::Batches(BatchesNotification {
                    batches: vec![batch.clone()],
                }),
            })
            .collect()
    }

    /// Adopt the next round: recompute target peers, re-send cached batches
    /// to them, and request the round's proposal from the issuer.
    #[instrument(skip_all, fields(round = %switch.next_round))]
    pub fn process_round_switch(&self, switch: RoundSwitch) -> Vec<Action> {
        let mut state = self.state.write();
        if state.stopped {
            return vec![];
        }

        info!(round = %switch.next_round, "Round switch");
        state.current_round = switch.next_round;
        state.targets = RoundTargets::compute(
            &state.previous_hash,
            &state.current_hash,
            &switch.ledger_state.peers,
            switch.next_round,
        );
        state.ledger_state = Some(switch.ledger_state);

        self.ordering_service
            .on_collaboration_outcome(switch.next_round);

        let Some(targets) = &state.targets else {
            warn!("Ledger has no peers, cannot request a proposal");
            return vec![];
        };

        let mut actions = Vec::new();

        // Re-send cached batches so the new target peers see them.
        let mut cached = Vec::new();
        self.ordering_service
            .for_cached_batches(&mut |batch| cached.push(batch.clone()));
        if !cached.is_empty() {
            for to in targets.distinct_peer_ids() {
                actions.push(Action::Send {
                    to,
                    message: OutboundMessage::Batches(BatchesNotification {
                        batches: cached.clone(),
                    }),
                });
            }
        }

        actions.push(Action::Send {
            to: targets.issuer.public_key.clone(),
            message: OutboundMessage::ProposalRequest(ProposalRequest {
                round: switch.next_round,
            }),
        });
        actions
    }

    /// Serve a remote peer's proposal request from the local service.
    pub fn serve_proposal_request(&self, from: String, round: Round) -> Vec<Action> {
        if self.state.read().stopped {
            return vec![];
        }
        let proposal = self
            .ordering_service
            .on_request_proposal(round)
            .map(|p| (*p).clone());
        vec![Action::Send {
            to: from,
            message: OutboundMessage::ProposalResponse(ProposalResponse { round, proposal }),
        }]
    }

    /// Handle the proposal response for the current round.
    ///
    /// Foreign-round responses are dropped. The proposal is stripped of
    /// transactions already decided on-chain and of duplicates within the
    /// proposal itself before being handed to consensus.
    #[instrument(skip_all, fields(%round))]
    pub fn process_proposal_response(
        &self,
        round: Round,
        proposal: Option<Proposal>,
    ) -> Vec<Action> {
        let mut state = self.state.write();
        if state.stopped {
            return vec![];
        }
        if round != state.current_round {
            debug!(current = %state.current_round, "Proposal for foreign round dropped");
            return vec![];
        }
        if state.responded_round == Some(round) {
            debug!(%round, "Round already answered, late response dropped");
            return vec![];
        }
        let Some(ledger_state) = state.ledger_state.clone() else {
            warn!("No ledger state yet, proposal dropped");
            return vec![];
        };
        state.responded_round = Some(round);

        let proposal = proposal.and_then(|p| self.remove_replays_and_duplicates(p));
        vec![Action::EmitOrderingEvent {
            event: OrderingEvent {
                round,
                ledger_state,
                proposal,
            },
        }]
    }

    /// Track a committed block: shift the permutation seed hashes and evict
    /// the block's transactions from the batch cache.
    pub fn on_block_committed(&self, block: &Block) {
        {
            let mut state = self.state.write();
            if state.stopped {
                return;
            }
            state.previous_hash = block.prev_hash;
            state.current_hash = block.hash();
        }

        let mut hashes: HashSet<Hash> =
            block.transactions.iter().map(|tx| tx.hash()).collect();
        hashes.extend(block.rejected_tx_hashes.iter().copied());
        self.ordering_service.on_txs_committed(&hashes);
    }

    /// Drop transactions already decided on-chain or repeated within the
    /// proposal. An emptied proposal becomes `None`.
    fn remove_replays_and_duplicates(&self, proposal: Proposal) -> Option<Proposal> {
        let mut seen: HashSet<Hash> = HashSet::new();
        let kept: Vec<_> = proposal
            .transactions
            .into_iter()
            .filter(|tx| {
                let hash = tx.hash();
                if !seen.insert(hash) {
                    debug!(%hash, "Duplicate transaction stripped");
                    return false;
                }
                match self.tx_cache.status(&hash) {
                    Ok(TxStatus::Missing) => true,
                    Ok(_) => {
                        debug!(%hash, "Replayed transaction stripped");
                        false
                    }
                    Err(err) => {
                        warn!(%hash, %err, "Presence lookup failed, transaction stripped");
                        false
                    }
                }
            })
            .collect();

        if kept.is_empty() {
            return None;
        }
        Some(Proposal::new(
            proposal.height,
            proposal.created_time_ms,
            kept,
        ))
    }

    /// Stop the gate: all subsequent operations become no-ops.
    pub fn stop(&self) {
        let mut state = self.state.write();
        if !state.stopped {
            info!("Ordering gate stopped");
            state.stopped = true;
        }
    }

    pub fn current_round(&self) -> Round {
        self.state.read().current_round
    }
}
