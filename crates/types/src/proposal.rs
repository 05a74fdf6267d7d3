//! Ordering proposals.

use crate::hash::FieldHasher;
use crate::{Hash, Transaction};
use serde::{Deserialize, Serialize};

/// An ordered list of transactions proposed for one block round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub height: u64,
    pub created_time_ms: u64,
    pub transactions: Vec<Transaction>,
}

impl Proposal {
    pub fn new(height: u64, created_time_ms: u64, transactions: Vec<Transaction>) -> Self {
        Proposal {
            height,
            created_time_ms,
            transactions,
        }
    }

    /// Deterministic proposal digest.
    pub fn hash(&self) -> Hash {
        let tx_hashes: Vec<Hash> = self.transactions.iter().map(Transaction::hash).collect();
        FieldHasher::new("meridian.proposal.v1")
            .field(&self.height)
            .field(&self.created_time_ms)
            .field(&tx_hashes)
            .finish()
    }
}
