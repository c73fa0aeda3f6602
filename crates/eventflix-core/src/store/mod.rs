//! Durable key-value storage for client preferences.
//!
//! This module provides the `KeyValueStore` trait that the session and locale
//! managers persist through, plus two implementations:
//! - `FileStore`: a JSON document on disk, made durable on `commit`
//! - `MemoryStore`: a process-local map, used for tests and ephemeral runs
//!
//! Keys and values are plain strings. The well-known keys live in [`keys`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

/// Keys persisted by the client.
pub mod keys {
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const USER_ROLE: &str = "user_role";
    pub const SELECTED_LANGUAGE: &str = "selected_language";
}

/// Persistent string storage supplied by the host.
///
/// Mutations are visible to `get` as soon as they return. Whether they
/// survive a restart before `commit` is up to the implementation.
pub trait KeyValueStore: Send + Sync {
    /// Gets the value for the given key, or None if not found
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Sets the value for the given key
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the entry for the given key
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every entry
    fn clear(&self) -> Result<(), StoreError>;

    /// Makes all applied mutations durable
    fn commit(&self) -> Result<(), StoreError>;

    /// Removes every entry except `keep`, whose values are read before the
    /// clear and written back after it.
    ///
    /// Implementations holding an internal lock should override this so the
    /// read, clear and rewrite happen as one step.
    fn clear_except(&self, keep: &[&str]) -> Result<(), StoreError> {
        let mut saved = Vec::with_capacity(keep.len());
        for key in keep {
            if let Some(value) = self.get(key)? {
                saved.push((*key, value));
            }
        }
        self.clear()?;
        for (key, value) in saved {
            self.set(key, &value)?;
        }
        Ok(())
    }
}
