//! Outbound message types for network communication.

use meridian_messages::{
    BatchesNotification, BlockRequest, BlockResponse, PendingStateNotification, ProposalRequest,
    ProposalResponse, VoteState,
};

/// Outbound network messages.
///
/// These are the messages a node can send to other nodes. The runner handles
/// the actual network I/O.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// Batches forwarded to an ordering peer.
    Batches(BatchesNotification),

    /// Proposal request for a round.
    ProposalRequest(ProposalRequest),

    /// Proposal response for a round.
    ProposalResponse(ProposalResponse),

    /// Consensus vote state.
    VoteState(VoteState),

    /// Pending multi-signature batches.
    PendingState(PendingStateNotification),

    /// Block fetch request.
    BlockRequest(BlockRequest),

    /// Block fetch response.
    BlockResponse(BlockResponse),
}

impl OutboundMessage {
    /// Human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Batches(_) => "Batches",
            OutboundMessage::ProposalRequest(_) => "ProposalRequest",
            OutboundMessage::ProposalResponse(_) => "ProposalResponse",
            OutboundMessage::VoteState(_) => "VoteState",
            OutboundMessage::PendingState(_) => "PendingState",
            OutboundMessage::BlockRequest(_) => "BlockRequest",
            OutboundMessage::BlockResponse(_) => "BlockResponse",
        }
    }

    /// Check if this is an ordering-plane message.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            OutboundMessage::Batches(_)
                | OutboundMessage::ProposalRequest(_)
                | OutboundMessage::ProposalResponse(_)
        )
    }

    /// Check if this is a consensus-plane message.
    pub fn is_consensus(&self) -> bool {
        matches!(self, OutboundMessage::VoteState(_))
    }
}
