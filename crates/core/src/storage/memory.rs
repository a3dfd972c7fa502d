//! Process-local store for hosts without persistence and for tests

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::ports::{DurableStore, StoreError};

#[derive(Debug, Default)]
struct Entries {
    strings: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// Non-durable [`DurableStore`]. Contents live as long as the value.
///
/// Counts committed writes so callers can check that a mutation was
/// persisted synchronously.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
    commits: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes made with `commit = true`.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of string keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, commit: bool) {
        if commit {
            self.commits.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().strings.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str, commit: bool) -> Result<(), StoreError> {
        self.entries.write().strings.insert(key.to_string(), value.to_string());
        self.record(commit);
        Ok(())
    }

    fn remove(&self, key: &str, commit: bool) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        entries.strings.remove(key);
        entries.sets.remove(key);
        drop(entries);
        self.record(commit);
        Ok(())
    }

    fn get_string_set(&self, key: &str) -> Option<BTreeSet<String>> {
        self.entries.read().sets.get(key).cloned()
    }

    fn set_string_set(
        &self,
        key: &str,
        values: &BTreeSet<String>,
        commit: bool,
    ) -> Result<(), StoreError> {
        self.entries.write().sets.insert(key.to_string(), values.clone());
        self.record(commit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        store.set("a", "1", true).unwrap();
        assert_eq!(store.get("a").as_deref(), Some("1"));

        store.remove("a", false).unwrap();
        assert!(store.get("a").is_none());
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn string_sets_are_stored_separately() {
        let store = MemoryStore::new();
        let values: BTreeSet<String> = ["x".to_string(), "y".to_string()].into();
        store.set_string_set("GeofenceCache", &values, true).unwrap();

        assert_eq!(store.get_string_set("GeofenceCache"), Some(values));
        assert!(store.get("GeofenceCache").is_none());
        assert!(store.is_empty());
    }
}
