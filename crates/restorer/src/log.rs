//! Block log reading.

use meridian_types::Block;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors from block-log access.
#[derive(Debug, Error)]
pub enum BlockLogError {
    #[error("No block at height {0}")]
    NotFound(u64),

    #[error("Block at height {height} is unreadable: {reason}")]
    Unreadable { height: u64, reason: String },

    #[error("Block log I/O error: {0}")]
    Io(String),
}

/// Read access to the append-only block log.
///
/// Blocks live at heights `1..=top_height()`. `reload` refreshes any cached
/// view of the underlying storage (the log may be appended to by another
/// process).
pub trait BlockReader {
    fn top_height(&self) -> Result<u64, BlockLogError>;

    fn get_block(&self, height: u64) -> Result<Block, BlockLogError>;

    fn reload(&mut self) -> Result<(), BlockLogError>;
}

#[derive(Debug, Default)]
struct MemoryLogInner {
    blocks: Vec<Block>,
    /// Heights that read as torn (crash mid-write).
    unreadable: HashSet<u64>,
}

/// In-memory block log for tests and simulation.
///
/// Clones share the log, so a writer half can append while a restorer polls.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockLog {
    inner: Arc<RwLock<MemoryLogInner>>,
}

impl MemoryBlockLog {
    pub fn new() -> Self {
        MemoryBlockLog::default()
    }

    /// Append a block; its height must be `top + 1`.
    pub fn append(&self, block: Block) {
        let mut inner = self.inner.write();
        assert_eq!(
            block.height,
            inner.blocks.len() as u64 + 1,
            "block log is append-only and contiguous"
        );
        inner.blocks.push(block);
    }

    /// Mark a height as torn; reads will fail until cleared.
    pub fn mark_unreadable(&self, height: u64) {
        self.inner.write().unreadable.insert(height);
    }

    /// Clear a torn mark.
    pub fn mark_readable(&self, height: u64) {
        self.inner.write().unreadable.remove(&height);
    }
}

impl BlockReader for MemoryBlockLog {
    fn top_height(&self) -> Result<u64, BlockLogError> {
        Ok(self.inner.read().blocks.len() as u64)
    }

    fn get_block(&self, height: u64) -> Result<Block, BlockLogError> {
        let inner = self.inner.read();
        if inner.unreadable.contains(&height) {
            return Err(BlockLogError::Unreadable {
                height,
                reason: "torn write".into(),
            });
        }
        let index = height
            .checked_sub(1)
            .ok_or(BlockLogError::NotFound(height))? as usize;
        inner
            .blocks
            .get(index)
            .cloned()
            .ok_or(BlockLogError::NotFound(height))
    }

    fn reload(&mut self) -> Result<(), BlockLogError> {
        Ok(())
    }
}
