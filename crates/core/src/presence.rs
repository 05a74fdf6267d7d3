//! Transaction presence lookup.
//!
//! The ordering service and gate must know whether a transaction hash has
//! already been decided in some committed block. The cache is backed by the
//! WSV's `tx_status/` entries and is queried outside any store transaction.

use meridian_types::{Batch, Hash};
use thiserror::Error;

/// Errors from presence lookups.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Presence lookup failed: {0}")]
    Lookup(String),
}

/// Status of a transaction hash in the committed chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Applied in a committed block.
    Committed,
    /// Included in a committed block but rolled back.
    Rejected,
    /// Never seen in a committed block.
    Missing,
}

impl TxStatus {
    /// Whether the hash was already decided in some block.
    pub fn is_processed(&self) -> bool {
        !matches!(self, TxStatus::Missing)
    }
}

/// Lookup of committed/rejected transaction hashes.
pub trait TxPresenceCache: Send + Sync {
    /// Status of one transaction hash.
    fn status(&self, hash: &Hash) -> Result<TxStatus, PresenceError>;

    /// Whether any member transaction of `batch` was already processed.
    ///
    /// A lookup failure counts as processed: the batch is dropped rather
    /// than risking a replay.
    fn batch_already_processed(&self, batch: &Batch) -> bool {
        batch.transactions().iter().any(|tx| {
            self.status(&tx.hash())
                .map(|s| s.is_processed())
                .unwrap_or(true)
        })
    }
}
