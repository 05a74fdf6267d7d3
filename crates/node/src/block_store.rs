//! Candidate block store.
//!
//! Holds the blocks this node has voted on, keyed by hash, until consensus
//! commits one of them. Serves as the synchronizer's block source.

use meridian_sync::BlockSource;
use meridian_types::{Block, Hash};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Bounded cache of candidate blocks per height.
#[derive(Default)]
pub struct BlockStore {
    inner: Mutex<HashMap<Hash, Block>>,
}

impl BlockStore {
    pub fn new() -> Self {
        BlockStore::default()
    }

    pub fn insert(&self, block: Block) -> Hash {
        let hash = block.hash();
        self.inner.lock().insert(hash, block);
        hash
    }

    pub fn get(&self, hash: &Hash) -> Option<Block> {
        self.inner.lock().get(hash).cloned()
    }

    /// Drop candidates at or below `height`; they can no longer commit.
    pub fn prune_through(&self, height: u64) {
        self.inner.lock().retain(|_, block| block.height > height);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl BlockSource for BlockStore {
    fn get_block(&self, hash: &Hash) -> Option<Block> {
        self.get(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64) -> Block {
        Block {
            height,
            prev_hash: Hash::ZERO,
            created_time_ms: height,
            transactions: vec![],
            rejected_tx_hashes: vec![],
            signatures: vec![],
        }
    }

    #[test]
    fn pruning_drops_stale_candidates() {
        let store = BlockStore::new();
        let h2 = store.insert(block(2));
        let h3 = store.insert(block(3));
        store.prune_through(2);
        assert!(store.get(&h2).is_none());
        assert!(store.get(&h3).is_some());
    }
}
