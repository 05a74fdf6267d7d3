//! In-memory store backend for tests and simulation.

use crate::overlay::{KvTransaction, Overlay, WriteSet};
use crate::{StoreError, WsvStore};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// `BTreeMap`-backed WSV store.
///
/// Cheap to clone; clones share the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, String>>>,
    prepared: Arc<Mutex<HashMap<String, WriteSet>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Snapshot of every key/value pair, for determinism comparisons.
    pub fn dump(&self) -> BTreeMap<String, String> {
        self.data.read().clone()
    }

    fn apply(&self, writes: WriteSet) {
        let mut data = self.data.write();
        for (key, value) in writes {
            match value {
                Some(v) => {
                    data.insert(key, v);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
    }
}

impl WsvStore for MemoryStore {
    fn begin(&self) -> Box<dyn KvTransaction + '_> {
        Box::new(MemoryTransaction {
            store: self,
            overlay: Overlay::new(),
        })
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn commit_prepared(&self, id: &str) -> Result<(), StoreError> {
        let writes = self
            .prepared
            .lock()
            .remove(id)
            .ok_or_else(|| StoreError::UnknownPrepared(id.to_owned()))?;
        self.apply(writes);
        Ok(())
    }
}

struct MemoryTransaction<'s> {
    store: &'s MemoryStore,
    overlay: Overlay,
}

impl KvTransaction for MemoryTransaction<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(hit) = self.overlay.get(key) {
            return Ok(hit.map(str::to_owned));
        }
        Ok(self.store.data.read().get(key).cloned())
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
        let base: Vec<(String, String)> = {
            let data = self.store.data.read();
            data.range(prefix.to_owned()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
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
        self.store.apply(self.overlay.writes);
        Ok(())
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
