//! JSON-file implementation of the durable store
//!
//! The whole store is one JSON object. A committed write replaces the file
//! atomically (write to a sibling temp file, fsync, rename), so a crash
//! leaves either the previous or the new contents on disk. Uncommitted writes
//! stay in memory until the next commit, [`FileStore::sync`] or drop.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use intelligence_core::{DurableStore, StoreError};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{store_io_error, store_serde_error};

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Value>,
    dirty: bool,
}

/// Key/value store persisted as a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<State>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// An unreadable file is set aside as `<name>.corrupt` and the store
    /// starts empty.
    ///
    /// # Errors
    /// `Io` when the directory cannot be created or the file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| store_io_error(&e))?;
        }

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| store_io_error(&e))?;
            match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Store file unreadable; starting empty");
                    let aside = path.with_extension("corrupt");
                    if let Err(e) = fs::rename(&path, &aside) {
                        warn!(error = %e, "Failed to set aside unreadable store file");
                    }
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = entries.len(), "Store opened");
        Ok(Self { path, state: Mutex::new(State { entries, dirty: false }) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush uncommitted writes.
    ///
    /// # Errors
    /// `Io` or `Serialization` when the file cannot be written.
    pub fn sync(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.dirty {
            self.write(&mut state)?;
        }
        Ok(())
    }

    fn apply(
        &self,
        commit: bool,
        mutate: impl FnOnce(&mut BTreeMap<String, Value>),
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        mutate(&mut state.entries);
        state.dirty = true;
        if commit {
            self.write(&mut state)?;
        }
        Ok(())
    }

    fn write(&self, state: &mut State) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&state.entries).map_err(|e| store_serde_error(&e))?;

        let file_name = self.path.file_name().and_then(|n| n.to_str()).unwrap_or("store");
        let temp = self.path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        let written = File::create(&temp)
            .and_then(|mut file| {
                file.write_all(&json)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(store_io_error(&e));
        }

        state.dirty = false;
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.state.lock().entries.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn set(&self, key: &str, value: &str, commit: bool) -> Result<(), StoreError> {
        self.apply(commit, |entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
        })
    }

    fn remove(&self, key: &str, commit: bool) -> Result<(), StoreError> {
        self.apply(commit, |entries| {
            entries.remove(key);
        })
    }

    fn get_string_set(&self, key: &str) -> Option<BTreeSet<String>> {
        let state = self.state.lock();
        let values = state.entries.get(key)?.as_array()?;
        Some(values.iter().filter_map(Value::as_str).map(str::to_string).collect())
    }

    fn set_string_set(
        &self,
        key: &str,
        values: &BTreeSet<String>,
        commit: bool,
    ) -> Result<(), StoreError> {
        let array = values.iter().cloned().map(Value::String).collect();
        self.apply(commit, |entries| {
            entries.insert(key.to_string(), Value::Array(array));
        })
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            warn!(path = %self.path.display(), error = %e, "Failed to flush store on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn committed_writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("UserToken", r#"{"access_token":"abc"}"#, true).unwrap();
        store.set_string_set("GeofenceCache", &BTreeSet::from(["a".to_string()]), true).unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("UserToken").as_deref(), Some(r#"{"access_token":"abc"}"#));
        assert_eq!(
            reopened.get_string_set("GeofenceCache"),
            Some(BTreeSet::from(["a".to_string()]))
        );
    }

    #[test]
    fn deferred_writes_reach_disk_on_sync() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path).unwrap();

        store.set("k", "v", false).unwrap();
        assert!(!path.exists());

        store.sync().unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("k").as_deref(), Some("v"));
    }

    #[test]
    fn deferred_writes_are_flushed_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("k", "v", false).unwrap();
        }

        assert_eq!(FileStore::open(&path).unwrap().get("k").as_deref(), Some("v"));
    }

    #[test]
    fn remove_of_missing_key_succeeds() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json")).unwrap();
        store.remove("absent", true).unwrap();
        assert!(store.get("absent").is_none());
    }

    #[test]
    fn corrupt_file_is_set_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();

        assert!(store.get("anything").is_none());
        assert!(dir.path().join("store.corrupt").exists());
    }

    #[test]
    fn no_temp_files_are_left_behind() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json")).unwrap();
        for i in 0..5 {
            store.set("k", &i.to_string(), true).unwrap();
        }

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["store.json".to_string()]);
    }
}
