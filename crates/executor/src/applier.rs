//! Block application.
//!
//! A block is applied under one store transaction. Each member transaction
//! runs under its own savepoint: a failing command rolls the transaction's
//! writes back and records it as rejected, and the block still commits.
//! Store failures abort the whole block and surface to the caller for retry.

use crate::access::DbContext;
use crate::executor::CommandExecutor;
use meridian_store::{codec, keys, KvTransaction, StoreError, WsvStore};
use meridian_types::{Block, Hash, HexError, LedgerState, Peer};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Stored transaction status values.
pub const TX_STATUS_COMMITTED: &str = "committed";
pub const TX_STATUS_REJECTED: &str = "rejected";

/// Errors from applying a block.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Block height {got} does not follow WSV height {wsv}")]
    HeightMismatch { wsv: u64, got: u64 },

    #[error("Block prev_hash {got} does not match WSV top hash {expected}")]
    PrevHashMismatch { expected: Hash, got: Hash },

    #[error("Corrupt ledger state: {0}")]
    CorruptLedgerState(String),
}

impl From<HexError> for ApplyError {
    fn from(err: HexError) -> Self {
        ApplyError::CorruptLedgerState(err.to_string())
    }
}

/// Applies blocks to the WSV.
pub struct BlockApplier<'s> {
    store: &'s dyn WsvStore,
}

impl<'s> BlockApplier<'s> {
    pub fn new(store: &'s dyn WsvStore) -> Self {
        BlockApplier { store }
    }

    /// Apply `block` on top of the current WSV and commit.
    ///
    /// Returns the hashes of transactions rejected during execution. When
    /// the block already records rejected transactions (replay), those are
    /// skipped outright so replay reproduces the original state.
    ///
    /// Validation is skipped for the genesis block regardless of
    /// `do_validation`.
    pub fn apply_block(&self, block: &Block, do_validation: bool) -> Result<Vec<Hash>, ApplyError> {
        let (tx, rejected) = self.run(block, do_validation)?;
        tx.commit()?;
        info!(
            height = block.height,
            txs = block.transactions.len(),
            rejected = rejected.len(),
            "Block applied"
        );
        Ok(rejected)
    }

    /// Execute `block` against the WSV but discard every write.
    ///
    /// Used to determine the rejected-transaction set of a candidate block
    /// before voting on it.
    pub fn simulate_block(
        &self,
        block: &Block,
        do_validation: bool,
    ) -> Result<Vec<Hash>, ApplyError> {
        let (tx, rejected) = self.run(block, do_validation)?;
        tx.rollback();
        Ok(rejected)
    }

    fn run(
        &self,
        block: &Block,
        do_validation: bool,
    ) -> Result<(Box<dyn KvTransaction + 's>, Vec<Hash>), ApplyError> {
        let mut tx = self.store.begin();

        let wsv_height = match tx.get(keys::LEDGER_HEIGHT)? {
            Some(raw) => codec::decode_u64(&raw)?,
            None => 0,
        };
        if block.height != wsv_height + 1 {
            return Err(ApplyError::HeightMismatch {
                wsv: wsv_height,
                got: block.height,
            });
        }
        if block.height > 1 {
            let top = tx
                .get(keys::LEDGER_TOP_HASH)?
                .ok_or_else(|| ApplyError::CorruptLedgerState("missing top hash".into()))?;
            let top = Hash::from_hex(&top)?;
            if block.prev_hash != top {
                return Err(ApplyError::PrevHashMismatch {
                    expected: top,
                    got: block.prev_hash,
                });
            }
        }

        let validate = do_validation && !block.is_genesis();
        let known_rejected: HashSet<Hash> = block.rejected_tx_hashes.iter().copied().collect();
        let mut rejected = Vec::new();

        for (index, transaction) in block.transactions.iter().enumerate() {
            let tx_hash = transaction.hash();

            if known_rejected.contains(&tx_hash) {
                tx.put(&keys::tx_status(&tx_hash), TX_STATUS_REJECTED);
                rejected.push(tx_hash);
                continue;
            }

            let savepoint = format!("tx-{index}");
            tx.savepoint(&savepoint);

            let mut failure = None;
            for (cmd_index, command) in transaction.commands.iter().enumerate() {
                let mut ctx = DbContext::new(tx.as_mut());
                if let Err(err) = CommandExecutor::execute(
                    &mut ctx,
                    command,
                    transaction.creator.as_ref(),
                    &tx_hash,
                    cmd_index,
                    validate,
                ) {
                    failure = Some(err);
                    break;
                }
            }

            match failure {
                Some(err) => {
                    warn!(%tx_hash, %err, "Transaction rejected");
                    tx.rollback_to_savepoint(&savepoint)?;
                    tx.put(&keys::tx_status(&tx_hash), TX_STATUS_REJECTED);
                    rejected.push(tx_hash);
                }
                None => {
                    tx.release_savepoint(&savepoint);
                    tx.put(&keys::tx_status(&tx_hash), TX_STATUS_COMMITTED);
                    debug!(%tx_hash, "Transaction applied");
                }
            }
        }

        tx.put(keys::LEDGER_HEIGHT, &codec::encode_u64(block.height));
        tx.put(keys::LEDGER_TOP_HASH, &block.hash().to_hex());

        Ok((tx, rejected))
    }
}

/// Read the persisted ledger state, if any block has been applied.
pub fn read_ledger_state(store: &dyn WsvStore) -> Result<Option<LedgerState>, ApplyError> {
    let height = match store.get(keys::LEDGER_HEIGHT)? {
        Some(raw) => codec::decode_u64(&raw)?,
        None => return Ok(None),
    };
    let top = store
        .get(keys::LEDGER_TOP_HASH)?
        .ok_or_else(|| ApplyError::CorruptLedgerState("missing top hash".into()))?;
    let top_block_hash = Hash::from_hex(&top)?;
    let peers = read_peers(store)?;
    Ok(Some(LedgerState {
        height,
        top_block_hash,
        peers,
    }))
}

/// Read the current peer list from the WSV.
pub fn read_peers(store: &dyn WsvStore) -> Result<Vec<Peer>, ApplyError> {
    let tx = store.begin();
    let mut entries: Vec<(String, String)> = Vec::new();
    tx.iterate_prefix(keys::PEERS_ADDRESS_PREFIX, &mut |key, value| {
        if let Some(pubkey) = key.strip_prefix(keys::PEERS_ADDRESS_PREFIX) {
            entries.push((pubkey.to_owned(), value.to_owned()));
        }
        true
    })?;

    let mut peers = Vec::with_capacity(entries.len());
    for (pubkey, address) in entries {
        let tls_certificate = tx.get(&keys::peer_tls(&pubkey))?;
        peers.push(Peer {
            public_key: pubkey,
            address,
            tls_certificate,
        });
    }
    Ok(peers)
}
