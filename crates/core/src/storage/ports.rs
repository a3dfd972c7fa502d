//! Port interface for durable key/value storage

use std::collections::BTreeSet;

use thiserror::Error;

/// Storage backend failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(String),

    #[error("storage contents could not be serialized: {0}")]
    Serialization(String),
}

/// String-keyed persistent storage.
///
/// `commit = true` means the write is durable when the call returns;
/// `commit = false` lets the backend defer the write.
pub trait DurableStore: Send + Sync {
    /// Stored string for `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str, commit: bool) -> Result<(), StoreError>;

    /// Remove `key`; removing a missing key succeeds.
    fn remove(&self, key: &str, commit: bool) -> Result<(), StoreError>;

    /// Stored string set for `key`.
    fn get_string_set(&self, key: &str) -> Option<BTreeSet<String>>;

    /// Store a string set under `key`.
    fn set_string_set(
        &self,
        key: &str,
        values: &BTreeSet<String>,
        commit: bool,
    ) -> Result<(), StoreError>;
}
