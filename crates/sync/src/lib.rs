//! Synchronizer glue between consensus outcomes and the WSV.
//!
//! A commit outcome is turned into an applied block under a single store
//! transaction; a reject advances the reject round. Either way a
//! synchronization event carries the next round and the refreshed ledger
//! state back to the ordering gate.

use meridian_core::{Action, ConsensusOutcome, Event, SynchronizationEvent};
use meridian_executor::{read_ledger_state, BlockApplier};
use meridian_ordering::{next_commit_round, next_reject_round};
use meridian_store::WsvStore;
use meridian_types::{Block, Hash, LedgerState, Round};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Provides verified candidate blocks by hash.
///
/// The node keeps the blocks it voted for; a block missing here means the
/// node is behind and must fetch it from peers (handled by the restorer /
/// block loader plane).
pub trait BlockSource: Send + Sync {
    fn get_block(&self, hash: &Hash) -> Option<Block>;
}

/// Applies consensus outcomes to the WSV and drives round progression.
pub struct Synchronizer {
    store: Arc<dyn WsvStore>,
    source: Arc<dyn BlockSource>,
    current_round: Round,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn WsvStore>, source: Arc<dyn BlockSource>, initial_round: Round) -> Self {
        Synchronizer {
            store,
            source,
            current_round: initial_round,
        }
    }

    /// Process one consensus outcome.
    #[instrument(skip(self), fields(round = %outcome.round()))]
    pub fn on_outcome(&mut self, outcome: ConsensusOutcome) -> Vec<Action> {
        match outcome {
            ConsensusOutcome::Commit {
                round, block_hash, ..
            } => self.on_commit(round, block_hash),
            ConsensusOutcome::Reject { round } => self.on_reject(round),
            ConsensusOutcome::Future { round } => {
                // The block loader plane catches us up; nothing to apply
                // from here.
                info!(%round, current = %self.current_round, "Behind the network");
                vec![]
            }
        }
    }

    fn on_commit(&mut self, round: Round, block_hash: Hash) -> Vec<Action> {
        // Agreement on the empty hash: the round had no proposal, so there
        // is nothing to apply and the round is treated as rejected.
        if block_hash == Hash::ZERO {
            debug!(%round, "Agreement on none");
            return self.on_reject(round);
        }

        let Some(block) = self.source.get_block(&block_hash) else {
            warn!(%block_hash, "Committed block not found locally");
            return vec![];
        };

        let rejected = match BlockApplier::new(self.store.as_ref()).apply_block(&block, true) {
            Ok(rejected) => rejected,
            Err(err) => {
                // Store failures abort the commit; the caller retries.
                warn!(%err, height = block.height, "Block commit failed");
                return vec![];
            }
        };
        if rejected != block.rejected_tx_hashes {
            warn!(
                height = block.height,
                "Rejected set diverged from the voted block"
            );
        }

        let ledger_state = match self.ledger_state() {
            Some(state) => state,
            None => return vec![],
        };

        let new_round = next_commit_round(round);
        self.current_round = new_round;
        debug!(%new_round, height = block.height, "Commit applied");

        let mut tx_hashes: Vec<Hash> = block.transactions.iter().map(|tx| tx.hash()).collect();
        tx_hashes.extend(block.rejected_tx_hashes.iter().copied());

        vec![
            Action::EnqueueInternal {
                event: Event::TxsCommitted { hashes: tx_hashes },
            },
            Action::EmitSyncEvent {
                event: SynchronizationEvent::Commit {
                    block_hash,
                    new_round,
                    ledger_state,
                },
            },
        ]
    }

    fn on_reject(&mut self, round: Round) -> Vec<Action> {
        let ledger_state = match self.ledger_state() {
            Some(state) => state,
            None => return vec![],
        };
        let new_round = next_reject_round(round);
        self.current_round = new_round;
        debug!(%new_round, "Reject processed");
        vec![Action::EmitSyncEvent {
            event: SynchronizationEvent::Reject {
                new_round,
                ledger_state,
            },
        }]
    }

    fn ledger_state(&self) -> Option<LedgerState> {
        match read_ledger_state(self.store.as_ref()) {
            Ok(Some(state)) => Some(state),
            Ok(None) => Some(LedgerState::genesis(vec![])),
            Err(err) => {
                warn!(%err, "Cannot read ledger state");
                None
            }
        }
    }

    pub fn current_round(&self) -> Round {
        self.current_round
    }
}
