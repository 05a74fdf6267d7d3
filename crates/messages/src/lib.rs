//! Network messages for the Meridian protocol.
//!
//! Every RPC payload is one of the typed envelopes defined here. The wire
//! form is `[version: u8][bincode payload]`; hashes, public keys and
//! signatures inside the payloads are the canonical byte forms whose string
//! rendering is lowercase hex. Encoding must stay bit-exact across peers:
//! message digests are computed over the canonical serialization.

mod codec;

pub use codec::{decode_payload, encode_payload, CodecError, WIRE_VERSION};

use meridian_types::{Batch, Block, Proposal, Round, VoteMessage};
use serde::{Deserialize, Serialize};

/// Marker trait for protocol messages.
pub trait NetworkMessage: Serialize + for<'de> Deserialize<'de> {
    /// Stable identifier used for routing/topics.
    fn message_type_id() -> &'static str;
}

/// Transaction batches forwarded to an ordering peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchesNotification {
    pub batches: Vec<Batch>,
}

impl NetworkMessage for BatchesNotification {
    fn message_type_id() -> &'static str {
        "ordering.batches"
    }
}

/// Request for the proposal of one round, sent to the round's issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub round: Round,
}

impl NetworkMessage for ProposalRequest {
    fn message_type_id() -> &'static str {
        "ordering.proposal_request"
    }
}

/// Response to a [`ProposalRequest`]; `None` when the ordering service has
/// nothing for the round (or the request timed out on the caller side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub round: Round,
    pub proposal: Option<Proposal>,
}

impl NetworkMessage for ProposalResponse {
    fn message_type_id() -> &'static str {
        "ordering.proposal_response"
    }
}

/// A set of consensus votes; both regular propagation and commit
/// certificates travel in this envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteState {
    pub votes: Vec<VoteMessage>,
}

impl NetworkMessage for VoteState {
    fn message_type_id() -> &'static str {
        "consensus.state"
    }
}

/// Pending (not yet fully signed) batches exchanged between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStateNotification {
    pub batches: Vec<Batch>,
}

impl NetworkMessage for PendingStateNotification {
    fn message_type_id() -> &'static str {
        "pending.state"
    }
}

/// Request for one block by height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRequest {
    pub height: u64,
}

impl NetworkMessage for BlockRequest {
    fn message_type_id() -> &'static str {
        "sync.block_request"
    }
}

/// Response to a [`BlockRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResponse {
    pub height: u64,
    pub block: Option<Block>,
}

impl NetworkMessage for BlockResponse {
    fn message_type_id() -> &'static str {
        "sync.block_response"
    }
}
