//! Presence cache backed by the WSV `tx_status/` entries.

use crate::applier::{TX_STATUS_COMMITTED, TX_STATUS_REJECTED};
use meridian_core::{PresenceError, TxPresenceCache, TxStatus};
use meridian_store::{keys, WsvStore};
use meridian_types::Hash;
use std::sync::Arc;

/// [`TxPresenceCache`] over the committed world state.
#[derive(Clone)]
pub struct StorePresenceCache {
    store: Arc<dyn WsvStore>,
}

impl StorePresenceCache {
    pub fn new(store: Arc<dyn WsvStore>) -> Self {
        StorePresenceCache { store }
    }
}

impl TxPresenceCache for StorePresenceCache {
    fn status(&self, hash: &Hash) -> Result<TxStatus, PresenceError> {
        let raw = self
            .store
            .get(&keys::tx_status(hash))
            .map_err(|e| PresenceError::Lookup(e.to_string()))?;
        match raw.as_deref() {
            None => Ok(TxStatus::Missing),
            Some(TX_STATUS_COMMITTED) => Ok(TxStatus::Committed),
            Some(TX_STATUS_REJECTED) => Ok(TxStatus::Rejected),
            Some(other) => Err(PresenceError::Lookup(format!(
                "corrupt tx status `{other}`"
            ))),
        }
    }
}
