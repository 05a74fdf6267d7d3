//! Committed blocks.

use crate::hash::FieldHasher;
use crate::{Hash, Transaction, TransactionSignature};
use serde::{Deserialize, Serialize};

/// A committed proposal plus chain metadata and signatures.
///
/// `rejected_tx_hashes` records transactions that failed stateful execution;
/// they are part of the block (and of its hash) so replay reproduces the same
/// split between applied and rejected transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub prev_hash: Hash,
    pub created_time_ms: u64,
    pub transactions: Vec<Transaction>,
    pub rejected_tx_hashes: Vec<Hash>,
    pub signatures: Vec<TransactionSignature>,
}

impl Block {
    /// Digest over the block payload (signatures excluded).
    pub fn hash(&self) -> Hash {
        let tx_hashes: Vec<Hash> = self.transactions.iter().map(Transaction::hash).collect();
        FieldHasher::new("meridian.block.v1")
            .field(&self.height)
            .field(&self.prev_hash)
            .field(&self.created_time_ms)
            .field(&tx_hashes)
            .field(&self.rejected_tx_hashes)
            .finish()
    }

    /// Whether this is the genesis block, which skips validation.
    pub fn is_genesis(&self) -> bool {
        self.height == 1
    }
}
