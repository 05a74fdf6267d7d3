//! Pending multi-signature transaction pool.
//!
//! Batches that have not yet collected all required signatures accumulate
//! here, per creator, until quorum or expiry. Retrieval is paginated: pages
//! are cut on batch boundaries (batches are indivisible), in insertion
//! order, with a cursor to the first batch that did not fit.
//!
//! Expiry is caller-driven through [`PendingPool::remove_batch`]; the pool
//! itself keeps no clock.

use meridian_types::{AccountId, Batch, Hash, Transaction};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from pending-pool queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PendingError {
    /// The requested start batch is not pending for that creator.
    #[error("Start batch not found")]
    NotFound,
}

/// Cursor to the first batch that did not fit into a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    pub first_tx_hash: Hash,
    pub batch_size: u64,
}

/// One page of pending transactions for a creator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPage {
    /// Whole batches, in insertion order.
    pub transactions: Vec<Transaction>,
    /// Total pending transactions across all of the creator's batches.
    pub all_transactions_size: u64,
    /// Set when a batch did not fit into the page.
    pub next_batch_info: Option<BatchInfo>,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    /// Insertion-ordered batches; the sequence number is the order.
    batches: BTreeMap<u64, Arc<Batch>>,
    /// Identity index: hash of a batch's first transaction → sequence.
    by_first_hash: HashMap<Hash, u64>,
    /// Creator → sequences of batches containing their transactions.
    by_creator: HashMap<AccountId, BTreeSet<u64>>,
}

impl Inner {
    fn insert(&mut self, batch: Arc<Batch>, first_hash: Hash) {
        let seq = self.next_seq;
        self.next_seq += 1;
        for creator in batch.creators() {
            self.by_creator.entry(creator).or_default().insert(seq);
        }
        self.by_first_hash.insert(first_hash, seq);
        self.batches.insert(seq, batch);
    }

    fn remove_by_first_hash(&mut self, first_hash: &Hash) -> Option<Arc<Batch>> {
        let seq = self.by_first_hash.remove(first_hash)?;
        let batch = self.batches.remove(&seq)?;
        for creator in batch.creators() {
            if let Some(seqs) = self.by_creator.get_mut(&creator) {
                seqs.remove(&seq);
                if seqs.is_empty() {
                    self.by_creator.remove(&creator);
                }
            }
        }
        Some(batch)
    }
}

/// The pending-transaction store.
///
/// Readers copy the page slice out under the read lock, so pagination never
/// blocks writers across page boundaries.
#[derive(Default)]
pub struct PendingPool {
    inner: RwLock<Inner>,
}

impl PendingPool {
    pub fn new() -> Self {
        PendingPool::default()
    }

    /// Merge an incoming delta of partially signed batches.
    ///
    /// A batch already pending (same first-transaction hash) absorbs the
    /// incoming signatures in place, keeping its position. Batches that
    /// reach quorum — immediately or through the merge — are removed and
    /// returned for propagation to ordering.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub fn updated_batches_handler(&self, batches: Vec<Batch>) -> Vec<Batch> {
        let mut completed = Vec::new();
        let mut inner = self.inner.write();

        for incoming in batches {
            let Some(first_hash) = incoming.first_tx_hash() else {
                continue;
            };

            match inner.by_first_hash.get(&first_hash).copied() {
                Some(seq) => {
                    let merged = {
                        let existing = &inner.batches[&seq];
                        let mut merged = existing.as_ref().clone();
                        merged.merge_signatures_from(&incoming);
                        merged
                    };
                    if merged.is_complete() {
                        inner.remove_by_first_hash(&first_hash);
                        debug!(%first_hash, "Pending batch completed");
                        completed.push(merged);
                    } else {
                        inner.batches.insert(seq, Arc::new(merged));
                    }
                }
                None => {
                    if incoming.is_complete() {
                        completed.push(incoming);
                    } else {
                        inner.insert(Arc::new(incoming), first_hash);
                    }
                }
            }
        }
        completed
    }

    /// Remove a batch (committed in a block, or expired).
    pub fn remove_batch(&self, batch: &Batch) {
        if let Some(first_hash) = batch.first_tx_hash() {
            self.inner.write().remove_by_first_hash(&first_hash);
        }
    }

    /// Remove every batch containing one of the given transaction hashes
    /// (the transactions were decided in a committed block).
    pub fn remove_by_tx_hashes(&self, hashes: &[Hash]) {
        let mut inner = self.inner.write();
        let victims: Vec<Hash> = inner
            .batches
            .values()
            .filter(|batch| {
                batch
                    .transactions()
                    .iter()
                    .any(|tx| hashes.contains(&tx.hash()))
            })
            .filter_map(|batch| batch.first_tx_hash())
            .collect();
        for first_hash in victims {
            inner.remove_by_first_hash(&first_hash);
        }
    }

    /// Number of pending batches.
    pub fn len(&self) -> usize {
        self.inner.read().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paginated retrieval of a creator's pending transactions.
    ///
    /// Pages contain whole batches in insertion order and end just before
    /// the batch that would overflow `page_size`. `start_hash` positions the
    /// page at the batch whose first transaction has that hash;
    /// [`PendingError::NotFound`] when that batch is not pending for the
    /// creator.
    pub fn get_pending_transactions(
        &self,
        creator: &AccountId,
        page_size: usize,
        start_hash: Option<Hash>,
    ) -> Result<PendingPage, PendingError> {
        let inner = self.inner.read();

        let seqs: Vec<u64> = inner
            .by_creator
            .get(creator)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();

        let all_transactions_size: u64 = seqs
            .iter()
            .map(|seq| inner.batches[seq].len() as u64)
            .sum();

        let start_index = match start_hash {
            Some(hash) => seqs
                .iter()
                .position(|seq| inner.batches[seq].first_tx_hash() == Some(hash))
                .ok_or(PendingError::NotFound)?,
            None => 0,
        };

        let mut page = PendingPage {
            all_transactions_size,
            ..PendingPage::default()
        };
        for seq in &seqs[start_index..] {
            let batch = &inner.batches[seq];
            if page.transactions.len() + batch.len() > page_size {
                page.next_batch_info = batch.first_tx_hash().map(|first_tx_hash| BatchInfo {
                    first_tx_hash,
                    batch_size: batch.len() as u64,
                });
                break;
            }
            page.transactions.extend(batch.transactions().iter().cloned());
        }
        Ok(page)
    }
}
