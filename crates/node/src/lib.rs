//! Node runner.
//!
//! Wires the subsystems into three single-threaded engines over tokio mpsc
//! channels:
//!
//! - **Ordering**: gate, ordering service, pending pool
//! - **Consensus**: YAC state machine and its vote timer
//! - **Synchronizer**: block application and round progression
//!
//! Each engine drains one channel, so per-subsystem handlers are serialized
//! without further locking. Handlers return [`meridian_core::Action`]s; the
//! runner executes them (network sends, timers, cross-engine events).

mod block_log;
mod block_store;
mod config;
mod network;
mod node;
mod timers;

pub use block_log::{BlockLog, FileBlockLog, ReaderAdapter};
pub use block_store::BlockStore;
pub use config::{ConsistencyModelConfig, NodeConfig};
pub use network::{ChannelNetwork, EngineSenders, NetworkAdapter};
pub use node::{Node, NodeError};
pub use timers::TimerManager;
