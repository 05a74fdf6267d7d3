//! Event types for the deterministic state machines.

use crate::outcome::{ConsensusOutcome, RoundSwitch};
use crate::PeerId;
use meridian_types::{Batch, Block, Hash, Peer, Proposal, Round, VoteMessage, YacHash};

/// Priority levels for event ordering within the same timestamp.
///
/// Lower values are processed first. Internal events (consequences of prior
/// processing) run before new external inputs, preserving causality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Consequences of prior event processing.
    Internal = 0,

    /// Timers scheduled by the node itself.
    Timer = 1,

    /// External inputs from other nodes.
    Network = 2,

    /// External inputs from clients.
    Client = 3,
}

/// All possible events a node can receive.
///
/// Events are passive data; the owning engine processes them and returns
/// actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// The vote re-propagation delay expired for the current round.
    VoteTimer,

    // ═══════════════════════════════════════════════════════════════════════
    // Network Messages - Ordering (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// Batches arrived from a peer (gossip or forwarding).
    BatchesReceived { batches: Vec<Batch> },

    /// A peer requests the proposal for a round.
    ProposalRequestReceived { from: PeerId, round: Round },

    /// A proposal response arrived (or the request timed out: `None`).
    ProposalResponseReceived {
        round: Round,
        proposal: Option<Proposal>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Network Messages - Consensus (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// A set of consensus votes arrived.
    VoteStateReceived { votes: Vec<VoteMessage> },

    // ═══════════════════════════════════════════════════════════════════════
    // Network Messages - Pending pool (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// Partially signed batches arrived from a peer.
    PendingStateReceived { batches: Vec<Batch> },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal Events (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// Consensus finished a round.
    OutcomeReady { outcome: ConsensusOutcome },

    /// The synchronizer advanced to a new round.
    RoundSwitched { switch: RoundSwitch },

    /// Batches reached their signature quorum in the pending pool.
    BatchesCompleted { batches: Vec<Batch> },

    /// Transactions were committed in a block; caches must evict them.
    TxsCommitted { hashes: Vec<Hash> },

    /// A candidate block was formed for the round; consensus votes on it.
    CandidateReady {
        hash: YacHash,
        /// Ledger peers for deriving the round's cluster order.
        ledger_peers: Vec<Peer>,
    },

    /// A block was committed to the WSV.
    BlockCommitted { block: Block },

    // ═══════════════════════════════════════════════════════════════════════
    // Client Requests (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// A client submitted a batch.
    BatchSubmitted { batch: Batch },
}

impl Event {
    /// Get the priority for this event type.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::VoteTimer => EventPriority::Timer,

            Event::BatchesReceived { .. }
            | Event::ProposalRequestReceived { .. }
            | Event::ProposalResponseReceived { .. }
            | Event::VoteStateReceived { .. }
            | Event::PendingStateReceived { .. } => EventPriority::Network,

            Event::OutcomeReady { .. }
            | Event::RoundSwitched { .. }
            | Event::BatchesCompleted { .. }
            | Event::TxsCommitted { .. }
            | Event::CandidateReady { .. }
            | Event::BlockCommitted { .. } => EventPriority::Internal,

            Event::BatchSubmitted { .. } => EventPriority::Client,
        }
    }

    /// Check if this is an internal event.
    pub fn is_internal(&self) -> bool {
        self.priority() == EventPriority::Internal
    }

    /// Get the event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::VoteTimer => "VoteTimer",
            Event::BatchesReceived { .. } => "BatchesReceived",
            Event::ProposalRequestReceived { .. } => "ProposalRequestReceived",
            Event::ProposalResponseReceived { .. } => "ProposalResponseReceived",
            Event::VoteStateReceived { .. } => "VoteStateReceived",
            Event::PendingStateReceived { .. } => "PendingStateReceived",
            Event::OutcomeReady { .. } => "OutcomeReady",
            Event::RoundSwitched { .. } => "RoundSwitched",
            Event::BatchesCompleted { .. } => "BatchesCompleted",
            Event::TxsCommitted { .. } => "TxsCommitted",
            Event::CandidateReady { .. } => "CandidateReady",
            Event::BlockCommitted { .. } => "BlockCommitted",
            Event::BatchSubmitted { .. } => "BatchSubmitted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_order_internal_first() {
        assert!(EventPriority::Internal < EventPriority::Timer);
        assert!(EventPriority::Timer < EventPriority::Network);
        assert!(EventPriority::Network < EventPriority::Client);
    }

    #[test]
    fn timer_event_priority() {
        assert_eq!(Event::VoteTimer.priority(), EventPriority::Timer);
        assert!(Event::TxsCommitted { hashes: vec![] }.is_internal());
    }
}
