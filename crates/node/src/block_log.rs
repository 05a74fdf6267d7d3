//! File-backed block log.
//!
//! One bincode-encoded block per file, named by zero-padded height
//! (`0000000001.blk`). The log is append-only; the restorer tolerates a
//! torn final file by probing backward.

use meridian_restorer::{BlockLogError, BlockReader, MemoryBlockLog};
use meridian_types::Block;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Append and read access to the block log.
pub trait BlockLog: Send + Sync {
    fn append(&self, block: &Block) -> Result<(), BlockLogError>;

    fn top_height(&self) -> Result<u64, BlockLogError>;

    fn get_block(&self, height: u64) -> Result<Block, BlockLogError>;
}

impl BlockLog for MemoryBlockLog {
    fn append(&self, block: &Block) -> Result<(), BlockLogError> {
        MemoryBlockLog::append(self, block.clone());
        Ok(())
    }

    fn top_height(&self) -> Result<u64, BlockLogError> {
        BlockReader::top_height(self)
    }

    fn get_block(&self, height: u64) -> Result<Block, BlockLogError> {
        BlockReader::get_block(self, height)
    }
}

/// Blocks stored as one file per height under a directory.
pub struct FileBlockLog {
    dir: PathBuf,
    /// Cached top height; `reload` rescans the directory.
    top: RwLock<u64>,
}

impl FileBlockLog {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, BlockLogError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| BlockLogError::Io(e.to_string()))?;
        let log = FileBlockLog {
            dir,
            top: RwLock::new(0),
        };
        let top = log.scan_top()?;
        *log.top.write() = top;
        Ok(log)
    }

    fn path_for(&self, height: u64) -> PathBuf {
        self.dir.join(format!("{height:010}.blk"))
    }

    fn scan_top(&self) -> Result<u64, BlockLogError> {
        let mut top = 0u64;
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| BlockLogError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| BlockLogError::Io(e.to_string()))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(height) = name
                .strip_suffix(".blk")
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                top = top.max(height);
            }
        }
        Ok(top)
    }

    /// Rescan the directory for blocks appended by another process.
    pub fn reload(&self) -> Result<(), BlockLogError> {
        let top = self.scan_top()?;
        *self.top.write() = top;
        Ok(())
    }
}

impl BlockLog for FileBlockLog {
    fn append(&self, block: &Block) -> Result<(), BlockLogError> {
        let mut top = self.top.write();
        let expected = *top + 1;
        if block.height != expected {
            return Err(BlockLogError::Io(format!(
                "append out of order: expected height {expected}, got {}",
                block.height
            )));
        }
        let bytes = bincode::serialize(block).map_err(|e| BlockLogError::Io(e.to_string()))?;
        std::fs::write(self.path_for(block.height), bytes)
            .map_err(|e| BlockLogError::Io(e.to_string()))?;
        *top = block.height;
        debug!(height = block.height, "Block appended to log");
        Ok(())
    }

    fn top_height(&self) -> Result<u64, BlockLogError> {
        Ok(*self.top.read())
    }

    fn get_block(&self, height: u64) -> Result<Block, BlockLogError> {
        let path = self.path_for(height);
        let bytes = std::fs::read(&path).map_err(|_| BlockLogError::NotFound(height))?;
        bincode::deserialize(&bytes).map_err(|e| BlockLogError::Unreadable {
            height,
            reason: e.to_string(),
        })
    }
}

/// Adapts a shared [`BlockLog`] to the restorer's [`BlockReader`].
pub struct ReaderAdapter {
    log: Arc<dyn BlockLog>,
}

impl ReaderAdapter {
    pub fn new(log: Arc<dyn BlockLog>) -> Self {
        ReaderAdapter { log }
    }
}

impl BlockReader for ReaderAdapter {
    fn top_height(&self) -> Result<u64, BlockLogError> {
        self.log.top_height()
    }

    fn get_block(&self, height: u64) -> Result<Block, BlockLogError> {
        self.log.get_block(height)
    }

    fn reload(&mut self) -> Result<(), BlockLogError> {
        Ok(())
    }
}
