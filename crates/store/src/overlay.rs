//! Overlay transactions.
//!
//! A transaction buffers writes in an in-memory overlay on top of a backend
//! snapshot view. Reads consult the overlay first; iteration merges backend
//! and overlay entries. Savepoints snapshot the overlay by name, nesting in
//! a stack: rolling back to a savepoint discards every later savepoint.

use crate::StoreError;
use std::collections::BTreeMap;

/// Buffered writes: key → new value, or `None` for a delete.
pub type WriteSet = BTreeMap<String, Option<String>>;

/// A transaction over the WSV store.
///
/// The `commit`/`rollback`/`prepare` methods consume the transaction.
pub trait KvTransaction {
    /// Read a key, overlay first.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Buffer a write.
    fn put(&mut self, key: &str, value: &str);

    /// Buffer a delete.
    fn delete(&mut self, key: &str);

    /// Visit `(key, value)` pairs under `prefix` in key order, merged across
    /// backend and overlay. The visitor returns `false` to stop early.
    fn iterate_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &str) -> bool,
    ) -> Result<(), StoreError>;

    /// Create a named savepoint at the current overlay state.
    fn savepoint(&mut self, name: &str);

    /// Drop a savepoint without rolling back. Unknown names are a no-op.
    fn release_savepoint(&mut self, name: &str);

    /// Restore the overlay to the named savepoint, discarding it and every
    /// later savepoint.
    fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), StoreError>;

    /// Apply the overlay to the backend atomically.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard the overlay.
    fn rollback(self: Box<Self>);

    /// Stage the overlay under `id` for a later
    /// [`crate::WsvStore::commit_prepared`].
    fn prepare(self: Box<Self>, id: &str) -> Result<(), StoreError>;
}

/// Shared overlay state used by both backends.
#[derive(Debug, Default)]
pub(crate) struct Overlay {
    pub writes: WriteSet,
    savepoints: Vec<(String, WriteSet)>,
}

impl Overlay {
    pub fn new() -> Self {
        Overlay::default()
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.writes.get(key).map(|v| v.as_deref())
    }

    pub fn put(&mut self, key: &str, value: &str) {
        self.writes.insert(key.to_owned(), Some(value.to_owned()));
    }

    pub fn delete(&mut self, key: &str) {
        self.writes.insert(key.to_owned(), None);
    }

    pub fn savepoint(&mut self, name: &str) {
        self.savepoints.push((name.to_owned(), self.writes.clone()));
    }

    pub fn release_savepoint(&mut self, name: &str) {
        if let Some(pos) = self.savepoints.iter().rposition(|(n, _)| n == name) {
            self.savepoints.remove(pos);
        }
    }

    pub fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), StoreError> {
        let pos = self
            .savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| StoreError::UnknownSavepoint(name.to_owned()))?;
        let (_, snapshot) = self.savepoints.swap_remove(pos);
        self.savepoints.truncate(pos);
        self.writes = snapshot;
        Ok(())
    }

    /// Merge backend pairs under `prefix` with the overlay and visit them in
    /// key order.
    pub fn visit_merged(
        &self,
        prefix: &str,
        backend_pairs: Vec<(String, String)>,
        visitor: &mut dyn FnMut(&str, &str) -> bool,
    ) {
        let mut merged: BTreeMap<&str, Option<&str>> = backend_pairs
            .iter()
            .map(|(k, v)| (k.as_str(), Some(v.as_str())))
            .collect();
        for (k, v) in self.writes.range(prefix.to_owned()..) {
            if !k.starts_with(prefix) {
                break;
            }
            merged.insert(k.as_str(), v.as_deref());
        }
        for (k, v) in merged {
            if let Some(value) = v {
                if !visitor(k, value) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savepoint_rollback_restores_writes() {
        let mut overlay = Overlay::new();
        overlay.put("a", "1");
        overlay.savepoint("sp");
        overlay.put("a", "2");
        overlay.put("b", "3");
        overlay.rollback_to_savepoint("sp").unwrap();
        assert_eq!(overlay.get("a"), Some(Some("1")));
        assert_eq!(overlay.get("b"), None);
    }

    #[test]
    fn rollback_discards_later_savepoints() {
        let mut overlay = Overlay::new();
        overlay.savepoint("outer");
        overlay.put("x", "1");
        overlay.savepoint("inner");
        overlay.rollback_to_savepoint("outer").unwrap();
        assert!(overlay.rollback_to_savepoint("inner").is_err());
    }

    #[test]
    fn release_is_a_no_op_for_unknown_names() {
        let mut overlay = Overlay::new();
        overlay.release_savepoint("missing");
        overlay.savepoint("sp");
        overlay.release_savepoint("sp");
        assert!(overlay.rollback_to_savepoint("sp").is_err());
    }
}
