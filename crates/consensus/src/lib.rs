//! YAC consensus.
//!
//! Yet Another Consensus collects signed votes per round, detects
//! supermajority on a `(proposal_hash, block_hash)` pair, and emits exactly
//! one outcome per round: commit, reject, or — for votes from rounds ahead
//! of ours — a synchronization hint.
//!
//! # State machine
//!
//! ```text
//! Proposing → Voting → { Committed(hash) | Rejected(round) }
//! ```
//!
//! The terminal outcome is recorded per round; duplicate state messages for
//! a decided round are dropped silently. Laggards voting for past rounds are
//! answered with the stored commit certificate.

mod cluster;
mod storage;
mod supermajority;
mod yac;

pub use cluster::{ClusterOrdering, PeerOrderer};
pub use storage::{RoundOutcome, YacVoteStorage};
pub use supermajority::{ConsistencyModel, SupermajorityChecker};
pub use yac::{YacConfig, YacState};
