//! Transaction batches.

use crate::hash::FieldHasher;
use crate::{AccountId, Hash, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A group of transactions signed and ordered atomically.
///
/// Batches are indivisible for ordering and for the pending pool: either all
/// member transactions enter a proposal/page, or none do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    transactions: Vec<Transaction>,
}

impl Batch {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Batch { transactions }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Batch identity: digest over member transaction hashes.
    pub fn hash(&self) -> Hash {
        let hashes: Vec<Hash> = self.transactions.iter().map(Transaction::hash).collect();
        FieldHasher::new("meridian.batch.v1").field(&hashes).finish()
    }

    /// Hash of the first member transaction; the pagination cursor.
    pub fn first_tx_hash(&self) -> Option<Hash> {
        self.transactions.first().map(Transaction::hash)
    }

    /// Every distinct creator across member transactions.
    pub fn creators(&self) -> BTreeSet<AccountId> {
        self.transactions
            .iter()
            .filter_map(|tx| tx.creator.clone())
            .collect()
    }

    /// Whether every member transaction has reached its signature quorum.
    pub fn is_complete(&self) -> bool {
        self.transactions.iter().all(Transaction::has_quorum)
    }

    /// Replace a member transaction's signature set when the payload matches.
    ///
    /// Used when an updated copy of the batch arrives with more signatures.
    pub fn merge_signatures_from(&mut self, other: &Batch) {
        for (mine, theirs) in self.transactions.iter_mut().zip(other.transactions.iter()) {
            if mine.payload_hash() == theirs.payload_hash() {
                for sig in &theirs.signatures {
                    if !mine.signatures.contains(sig) {
                        mine.signatures.push(*sig);
                    }
                }
            }
        }
    }
}
