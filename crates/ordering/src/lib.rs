//! On-demand ordering.
//!
//! Ordering is pull-based: batches accumulate in the service's cache, and a
//! proposal for a round is only packed when some peer asks for it. The gate
//! is the per-node driver: it forwards client batches to the round's
//! ordering peers, requests proposals on round switches, and strips replayed
//! transactions from incoming proposals before consensus sees them.

mod common;
mod gate;
mod service;
mod targets;

pub use common::{next_commit_round, next_reject_round};
pub use gate::OrderingGate;
pub use service::{OnDemandOrderingService, TimeSource, DEFAULT_NUMBER_OF_PROPOSALS};
pub use targets::RoundTargets;
