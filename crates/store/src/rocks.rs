//! RocksDB store backend.
//!
//! All operations are synchronous blocking I/O. Callers in async contexts
//! should use `spawn_blocking` to avoid stalling the runtime.

use crate::overlay::{KvTransaction, Overlay, WriteSet};
use crate::{StoreError, WsvStore};
use parking_lot::Mutex;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// RocksDB-backed WSV store.
///
/// Keys and values are UTF-8 strings; the overlay transaction turns into a
/// single `WriteBatch` on commit, so a block's worth of writes lands
/// atomically.
pub struct RocksStore {
    db: Arc<DB>,
    prepared: Mutex<HashMap<String, WriteSet>>,
}

impl RocksStore {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(RocksStore {
            db: Arc::new(db),
            prepared: Mutex::new(HashMap::new()),
        })
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let raw = self
            .db
            .get(key.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        raw.map(|bytes| {
            String::from_utf8(bytes).map_err(|e| StoreError::Backend(e.to_string()))
        })
        .transpose()
    }

    fn prefix_pairs(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let iter = self.db.iterator(IteratorMode::From(
            prefix.as_bytes(),
            Direction::Forward,
        ));
        let mut pairs = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Backend(e.to_string()))?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let value = String::from_utf8(value.to_vec())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    fn apply(&self, writes: WriteSet) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        let entries = writes.len();
        for (key, value) in writes {
            match value {
                Some(v) => batch.put(key.as_bytes(), v.as_bytes()),
                None => batch.delete(key.as_bytes()),
            }
        }
        self.db
            .write(batch)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(entries, "Applied write batch");
        Ok(())
    }
}

impl WsvStore for RocksStore {
    fn begin(&self) -> Box<dyn KvTransaction + '_> {
        Box::new(RocksTransaction {
            store: self,
            overlay: Overlay::new(),
        })
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key)
    }

    fn commit_prepared(&self, id: &str) -> Result<(), StoreError> {
        let writes = self
            .prepared
            .lock()
            .remove(id)
            .ok_or_else(|| StoreError::UnknownPrepared(id.to_owned()))?;
        self.apply(writes)
    }
}

struct RocksTransaction<'s> {
    store: &'s RocksStore,
    overlay: Overlay,
}

impl KvTransaction for RocksTransaction<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(hit) = self.overlay.get(key) {
            return Ok(hit.map(str::to_owned));
        }
        self.store.read(key)
    }

    fn put(&mut self, key: &str, value: &str) {
        self.overlay.put(key, value);
    }

    fn delete(&mut self, key: &str) {
        self.overlay.delete(key);
    }

    fn iterate_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &str) -> bool,
    ) -> Result<(), StoreError> {
        let base = self.store.prefix_pairs(prefix)?;
        self.overlay.visit_merged(prefix, base, visitor);
        Ok(())
    }

    fn savepoint(&mut self, name: &str) {
        self.overlay.savepoint(name);
    }

    fn release_savepoint(&mut self, name: &str) {
        self.overlay.release_savepoint(name);
    }

    fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), StoreError> {
        self.overlay.rollback_to_savepoint(name)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.store.apply(self.overlay.writes)
    }

    fn rollback(self: Box<Self>) {}

    fn prepare(self: Box<Self>, id: &str) -> Result<(), StoreError> {
        self.store
            .prepared
            .lock()
            .insert(id.to_owned(), self.overlay.writes);
        Ok(())
    }
}
