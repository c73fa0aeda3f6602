use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;

use super::KeyValueStore;

/// Preference file name in the data directory
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Extension given to a preference file that could not be parsed
const CORRUPT_EXTENSION: &str = "json.corrupt";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(default)]
    entries: BTreeMap<String, String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, String>,
    dirty: bool,
}

/// Preference store backed by a single JSON file.
///
/// The file is read once on `open`. Mutations are applied to the in-memory
/// copy immediately and written back on `commit`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<State>,
}

impl FileStore {
    /// Open (or create) the preference file at `path`.
    ///
    /// A file that is not valid JSON is renamed to `preferences.json.corrupt`
    /// and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<PreferenceFile>(&contents) {
                Ok(file) => {
                    debug!(path = %path.display(), entries = file.entries.len(), "Preferences loaded");
                    file.entries
                }
                Err(e) => {
                    // Set the unreadable file aside and start over
                    let backup = path.with_extension(CORRUPT_EXTENSION);
                    warn!(
                        error = %e,
                        path = %path.display(),
                        backup = %backup.display(),
                        "Preference file is corrupt, starting empty"
                    );
                    std::fs::rename(&path, &backup)?;
                    BTreeMap::new()
                }
            }
        } else {
            debug!(path = %path.display(), "No preference file yet");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            state: Mutex::new(State {
                entries,
                dirty: false,
            }),
        })
    }

    /// Open `preferences.json` inside `dir`
    pub fn open_in(dir: &Path) -> Result<Self, StoreError> {
        Self::open(dir.join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let file = PreferenceFile {
            entries: entries.clone(),
            updated_at: Some(Utc::now()),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        // Write then rename so a crash never leaves a truncated file behind
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(error = %e, path = %self.path.display(), "Failed to replace preference file");
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.entries.insert(key.to_string(), value.to_string());
        state.dirty = true;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.entries.remove(key).is_some() {
            state.dirty = true;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.entries.is_empty() {
            state.entries.clear();
            state.dirty = true;
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.dirty {
            return Ok(());
        }
        self.write_file(&state.entries)?;
        state.dirty = false;
        debug!(path = %self.path.display(), "Preferences committed");
        Ok(())
    }

    fn clear_except(&self, keep: &[&str]) -> Result<(), StoreError> {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| keep.contains(&key.as_str()));
        if state.entries.len() != before {
            state.dirty = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_committed_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open_in(dir.path()).unwrap();
            store.set("auth_token", "abc").unwrap();
            store.set("selected_language", "ca").unwrap();
            store.commit().unwrap();
        }

        let reopened = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("selected_language").unwrap().as_deref(), Some("ca"));
    }

    #[test]
    fn test_uncommitted_values_are_not_durable() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open_in(dir.path()).unwrap();
            store.set("auth_token", "abc").unwrap();
            // Visible immediately in memory
            assert_eq!(store.get("auth_token").unwrap().as_deref(), Some("abc"));
        }

        let reopened = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap(), None);
    }

    #[test]
    fn test_clear_except_then_commit() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open_in(dir.path()).unwrap();
        store.set("auth_token", "abc").unwrap();
        store.set("user_role", "organizador").unwrap();
        store.set("selected_language", "en").unwrap();
        store.commit().unwrap();

        store.clear_except(&["selected_language"]).unwrap();
        store.commit().unwrap();

        let reopened = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap(), None);
        assert_eq!(reopened.get("user_role").unwrap(), None);
        assert_eq!(reopened.get("selected_language").unwrap().as_deref(), Some("en"));
    }

    #[test]
    fn test_corrupt_file_is_set_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);
        std::fs::write(&path, "{").unwrap();

        let store = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);
        assert!(!path.exists());
        let backup = dir.path().join("preferences.json.corrupt");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{");

        store.set("auth_token", "tok1").unwrap();
        store.commit().unwrap();

        let reopened = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap().as_deref(), Some("tok1"));
    }

    #[test]
    fn test_unusable_directory_is_reported() {
        let dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let result = FileStore::open(blocker.join(PREFERENCES_FILE));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
