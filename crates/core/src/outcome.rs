//! Cross-subsystem event payloads.

use meridian_types::{Hash, LedgerState, Proposal, Round, VoteMessage};

/// Terminal result of one consensus round.
///
/// Emitted exactly once per round by the consensus engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusOutcome {
    /// Supermajority agreed on a block.
    Commit {
        round: Round,
        block_hash: Hash,
        /// The votes forming the commit certificate.
        votes: Vec<VoteMessage>,
    },

    /// No candidate can reach supermajority in this round.
    Reject { round: Round },

    /// A vote arrived for a round ahead of ours; synchronization is needed.
    Future { round: Round },
}

impl ConsensusOutcome {
    pub fn round(&self) -> Round {
        match self {
            ConsensusOutcome::Commit { round, .. }
            | ConsensusOutcome::Reject { round }
            | ConsensusOutcome::Future { round } => *round,
        }
    }
}

/// Round switch notification fed into the ordering gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSwitch {
    pub next_round: Round,
    pub ledger_state: LedgerState,
}

/// The ordering gate's output for one round: the proposal (if any) after
/// replay and duplicate stripping, ready for stateful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingEvent {
    pub round: Round,
    pub ledger_state: LedgerState,
    pub proposal: Option<Proposal>,
}

/// Result of the synchronizer processing one consensus outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynchronizationEvent {
    /// A block was applied and committed to the WSV.
    Commit {
        block_hash: Hash,
        new_round: Round,
        ledger_state: LedgerState,
    },

    /// The round was rejected; ordering moves to the next reject round.
    Reject {
        new_round: Round,
        ledger_state: LedgerState,
    },
}

impl SynchronizationEvent {
    pub fn new_round(&self) -> Round {
        match self {
            SynchronizationEvent::Commit { new_round, .. }
            | SynchronizationEvent::Reject { new_round, .. } => *new_round,
        }
    }

    pub fn ledger_state(&self) -> &LedgerState {
        match self {
            SynchronizationEvent::Commit { ledger_state, .. }
            | SynchronizationEvent::Reject { ledger_state, .. } => ledger_state,
        }
    }
}
