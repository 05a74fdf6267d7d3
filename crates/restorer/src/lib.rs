//! World state restoration.
//!
//! On startup the node replays the block log onto the WSV: the persisted
//! ledger state tells how far the WSV already got, the log tells how far the
//! chain got, and the gap is replayed without validation.
//!
//! The optional wait-for-new-blocks mode keeps polling the log after
//! catch-up: reload, find the newest fully written block by probing backward
//! from the reported top, replay the new tail, sleep, repeat until stopped.
//! A torn tail block (crash mid-write) is simply skipped until readable.

mod log;

pub use log::{BlockLogError, BlockReader, MemoryBlockLog};

use meridian_executor::{read_ledger_state, ApplyError, BlockApplier};
use meridian_store::WsvStore;
use meridian_types::LedgerState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Delay between log polls in wait-for-new-blocks mode.
pub const WAIT_FOR_BLOCK_TIME: Duration = Duration::from_secs(5);

/// Errors from WSV restoration.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("WSV state (height {wsv}) is more recent than block storage (height {log})")]
    WsvAheadOfLog { wsv: u64, log: u64 },

    #[error(
        "The hash of the block applied to the WSV does not match the block \
         at height {height} in block storage"
    )]
    TopHashMismatch { height: u64 },

    #[error("Inconsistent block height in block storage: expected {expected}, got {got}")]
    InconsistentHeight { expected: u64, got: u64 },

    #[error(transparent)]
    Log(#[from] BlockLogError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Replays the block log onto the WSV.
pub struct WsvRestorer {
    wait_time: Duration,
}

impl Default for WsvRestorer {
    fn default() -> Self {
        WsvRestorer {
            wait_time: WAIT_FOR_BLOCK_TIME,
        }
    }
}

impl WsvRestorer {
    pub fn new() -> Self {
        WsvRestorer::default()
    }

    /// Override the poll delay (tests).
    pub fn with_wait_time(wait_time: Duration) -> Self {
        WsvRestorer { wait_time }
    }

    /// Restore the WSV from the block log.
    ///
    /// With `wait_for_new_blocks` the call keeps polling the log after
    /// catch-up and returns only once `stop` is set. Returns the final
    /// ledger state.
    pub fn restore(
        &self,
        store: &dyn WsvStore,
        reader: &mut dyn BlockReader,
        wait_for_new_blocks: bool,
        stop: &AtomicBool,
    ) -> Result<LedgerState, RestoreError> {
        let mut applied = self.catch_up(store, reader)?;

        while wait_for_new_blocks && !stop.load(Ordering::Relaxed) {
            std::thread::sleep(self.wait_time);
            reader.reload()?;
            let top = reader.top_height()?;

            // Find the newest fully written block: walk down from the
            // reported top while the block there is unreadable and we are
            // still above what has been applied.
            let mut candidate = top;
            while candidate > applied && reader.get_block(candidate).is_err() {
                warn!(height = candidate, "Block unreadable, probing backward");
                candidate -= 1;
            }

            if candidate > applied {
                info!(from = applied + 1, to = candidate, "Blockstore has new blocks");
                self.replay_range(store, reader, applied + 1, candidate)?;
                applied = candidate;
            }
        }

        Ok(read_ledger_state(store)?.unwrap_or_else(|| LedgerState::genesis(vec![])))
    }

    /// Reconcile the WSV with the log and replay the missing range.
    ///
    /// Returns the height the WSV is at afterwards.
    fn catch_up(
        &self,
        store: &dyn WsvStore,
        reader: &mut dyn BlockReader,
    ) -> Result<u64, RestoreError> {
        let log_top = reader.top_height()?;

        let wsv_height = match read_ledger_state(store)? {
            Some(state) => {
                if state.height > log_top {
                    return Err(RestoreError::WsvAheadOfLog {
                        wsv: state.height,
                        log: log_top,
                    });
                }
                if state.height >= 1 {
                    let top_block = reader.get_block(state.height)?;
                    if top_block.hash() != state.top_block_hash {
                        return Err(RestoreError::TopHashMismatch {
                            height: state.height,
                        });
                    }
                }
                state.height
            }
            None => 0,
        };

        if wsv_height < log_top {
            self.replay_range(store, reader, wsv_height + 1, log_top)?;
        }
        Ok(log_top)
    }

    fn replay_range(
        &self,
        store: &dyn WsvStore,
        reader: &mut dyn BlockReader,
        from: u64,
        to: u64,
    ) -> Result<(), RestoreError> {
        let applier = BlockApplier::new(store);
        for height in from..=to {
            let block = reader.get_block(height)?;
            if block.height != height {
                return Err(RestoreError::InconsistentHeight {
                    expected: height,
                    got: block.height,
                });
            }
            // Replay trusts the log: no stateful validation. The genesis
            // block additionally carries creator-less, unsigned
            // transactions, which only ever pass in this mode.
            applier.apply_block(&block, false)?;
            debug!(height, "Block replayed");
        }
        Ok(())
    }
}
