//! Core types for the Meridian pipeline.
//!
//! This crate provides the event-driven backbone shared by every subsystem:
//!
//! - [`Event`]: all possible inputs to the state machines
//! - [`Action`]: all possible outputs from the state machines
//! - [`EventPriority`]: ordering priority for events at the same timestamp
//! - [`OutboundMessage`]: network messages a node can send
//!
//! # Architecture
//!
//! ```text
//! Events → handler on the owning engine → Actions
//! ```
//!
//! Subsystem handlers are synchronous and deterministic: same state + event
//! produces the same actions. All I/O is performed by the runner, which
//! executes the returned actions and converts their results back into
//! events. Each subsystem (Ordering, Consensus, Synchronizer) owns one input
//! channel drained by a single-threaded engine, so handlers never race.

mod action;
mod event;
mod message;
mod outcome;
mod presence;

pub use action::Action;
pub use event::{Event, EventPriority};
pub use message::OutboundMessage;
pub use outcome::{ConsensusOutcome, OrderingEvent, RoundSwitch, SynchronizationEvent};
pub use presence::{PresenceError, TxPresenceCache, TxStatus};

/// Identifies a cancellable timer.
///
/// Cancelling is idempotent; a timer firing after its cancellation is a
/// no-op on the runner side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Consensus vote re-propagation delay for the current round.
    VoteDelay,
}

/// Peer identity used for directed sends: the peer's lowercase-hex public
/// key, as recorded in the WSV peer list.
pub type PeerId = String;
