//! Network adapter seam.
//!
//! The runner sends [`OutboundMessage`]s through this trait; the transport
//! behind it is out of the runner's hands. [`ChannelNetwork`] routes
//! messages between in-process nodes over their engine channels, which is
//! what tests and local simulation use.

use meridian_core::{Event, OutboundMessage};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Delivers a message from one peer to another; best-effort.
pub trait NetworkAdapter: Send + Sync {
    fn send(&self, from: &str, to: &str, message: OutboundMessage);
}

/// The event channels of one node's engines.
#[derive(Clone)]
pub struct EngineSenders {
    pub ordering: mpsc::Sender<Event>,
    pub consensus: mpsc::Sender<Event>,
    pub sync: mpsc::Sender<Event>,
}

/// In-process network: peer id → engine channels.
#[derive(Default)]
pub struct ChannelNetwork {
    nodes: RwLock<HashMap<String, EngineSenders>>,
}

impl ChannelNetwork {
    pub fn new() -> Self {
        ChannelNetwork::default()
    }

    pub fn register(&self, peer_id: String, senders: EngineSenders) {
        self.nodes.write().insert(peer_id, senders);
    }
}

impl NetworkAdapter for ChannelNetwork {
    fn send(&self, from: &str, to: &str, message: OutboundMessage) {
        let nodes = self.nodes.read();
        let Some(senders) = nodes.get(to) else {
            debug!(to, kind = message.type_name(), "Peer unreachable, message dropped");
            return;
        };

        let (sender, event) = match message {
            OutboundMessage::Batches(n) => (
                &senders.ordering,
                Event::BatchesReceived { batches: n.batches },
            ),
            OutboundMessage::ProposalRequest(r) => (
                &senders.ordering,
                Event::ProposalRequestReceived {
                    from: from.to_owned(),
                    round: r.round,
                },
            ),
            OutboundMessage::ProposalResponse(r) => (
                &senders.ordering,
                Event::ProposalResponseReceived {
                    round: r.round,
                    proposal: r.proposal,
                },
            ),
            OutboundMessage::VoteState(s) => (
                &senders.consensus,
                Event::VoteStateReceived { votes: s.votes },
            ),
            OutboundMessage::PendingState(p) => (
                &senders.ordering,
                Event::PendingStateReceived { batches: p.batches },
            ),
            // The block loader plane is not routed through engine channels.
            OutboundMessage::BlockRequest(_) | OutboundMessage::BlockResponse(_) => {
                debug!(to, "Block loader message ignored by channel network");
                return;
            }
        };

        // Best-effort delivery: a full channel drops the message, like a
        // saturated link would.
        if let Err(err) = sender.try_send(event) {
            warn!(to, %err, "Engine channel full, message dropped");
        }
    }
}
