use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, error, info, warn};

use crate::store::{keys, KeyValueStore};

use super::writer::{WriteOp, Writer};

/// Role string the backend assigns to event organizers
pub const ORGANIZER_ROLE: &str = "organizador";

/// A cached value that may not have been read from the store yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Unloaded,
    Loaded(Option<String>),
}

#[derive(Debug, Default)]
struct SessionCache {
    token: Slot,
    role: Slot,
}

struct Backend {
    store: Arc<dyn KeyValueStore>,
    writer: Writer,
}

/// Source of truth for "is the user signed in" and "what role do they have".
///
/// Starts uninitialized. `init` binds it to a store exactly once; until then
/// every operation is a logged no-op. No operation returns an error: storage
/// failures are logged and mapped to `None`/`false`.
pub struct SessionManager {
    backend: OnceLock<Backend>,
    cache: Mutex<SessionCache>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Create an uninitialized manager
    pub fn new() -> Self {
        Self {
            backend: OnceLock::new(),
            cache: Mutex::new(SessionCache::default()),
        }
    }

    /// Create a manager already bound to `store`
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        let manager = Self::new();
        manager.init(store);
        manager
    }

    /// Bind to the durable store and load the token and role into memory.
    ///
    /// Returns false if the manager was already initialized, in which case
    /// `store` is ignored.
    pub fn init(&self, store: Arc<dyn KeyValueStore>) -> bool {
        if self.backend.get().is_some() {
            debug!("Session manager already initialized");
            return false;
        }

        let token = Self::load_slot(store.as_ref(), keys::AUTH_TOKEN);
        let role = Self::load_slot(store.as_ref(), keys::USER_ROLE);

        let backend = Backend {
            writer: Writer::start(store.clone()),
            store,
        };
        if self.backend.set(backend).is_err() {
            debug!("Session manager initialized concurrently");
            return false;
        }

        let mut cache = self.lock_cache();
        cache.token = token;
        cache.role = role;
        info!(
            has_token = matches!(cache.token, Slot::Loaded(Some(_))),
            "Session manager initialized"
        );
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.get().is_some()
    }

    // ===== Token =====

    /// Remember the auth token. Blank tokens are ignored.
    ///
    /// The in-memory value changes before this returns; the durable write is
    /// queued and not awaited.
    pub fn save_token(&self, token: &str) {
        if token.trim().is_empty() {
            debug!("Ignoring blank token");
            return;
        }
        let Some(backend) = self.backend.get() else {
            error!("Session manager not initialized, token not saved");
            return;
        };

        // Queue under the cache lock so the store sees writes in cache order
        let mut cache = self.lock_cache();
        cache.token = Slot::Loaded(Some(token.to_string()));
        backend.writer.submit(WriteOp::Set {
            key: keys::AUTH_TOKEN,
            value: token.to_string(),
        });
    }

    pub fn get_token(&self) -> Option<String> {
        self.read(keys::AUTH_TOKEN, |cache| &mut cache.token)
    }

    // ===== Role =====

    pub fn save_user_role(&self, role: &str) {
        let Some(backend) = self.backend.get() else {
            error!("Session manager not initialized, role not saved");
            return;
        };

        let mut cache = self.lock_cache();
        cache.role = Slot::Loaded(Some(role.to_string()));
        backend.writer.submit(WriteOp::Set {
            key: keys::USER_ROLE,
            value: role.to_string(),
        });
    }

    pub fn get_user_role(&self) -> Option<String> {
        self.read(keys::USER_ROLE, |cache| &mut cache.role)
    }

    /// Whether the signed-in user may create and edit events
    pub fn is_organizer(&self) -> bool {
        self.get_user_role()
            .map(|role| role.eq_ignore_ascii_case(ORGANIZER_ROLE))
            .unwrap_or(false)
    }

    // ===== Login state =====

    /// True iff a non-empty token is present
    pub fn is_logged_in(&self) -> bool {
        self.get_token()
            .map(|token| !token.is_empty())
            .unwrap_or(false)
    }

    /// Stricter than `is_logged_in`: whitespace-only tokens do not count
    pub fn has_valid_token(&self) -> bool {
        self.get_token()
            .map(|token| !token.trim().is_empty())
            .unwrap_or(false)
    }

    // ===== Clearing =====

    /// Forget the token and role. The durable clear is queued, not awaited.
    ///
    /// The selected language is kept.
    pub fn clear_session(&self) {
        self.invalidate();
    }

    /// Forget the token and role and wait until the clear is committed.
    ///
    /// This is the only way to reset a session; use it before discarding the
    /// caller that triggered the clear (logout, account deletion, expiry).
    pub async fn clear_session_sync(&self) {
        if let Some(backend) = self.invalidate() {
            backend.writer.flush().await;
            info!("Session cleared and committed");
        }
    }

    /// Wait until every queued write has been committed
    pub async fn flush(&self) {
        if let Some(backend) = self.backend.get() {
            backend.writer.flush().await;
        }
    }

    // ===== Internals =====

    /// Empty the cache and queue the durable clear
    fn invalidate(&self) -> Option<&Backend> {
        let Some(backend) = self.backend.get() else {
            warn!("Session manager not initialized, nothing to clear");
            return None;
        };
        let mut cache = self.lock_cache();
        cache.token = Slot::Loaded(None);
        cache.role = Slot::Loaded(None);
        backend.writer.submit(WriteOp::ClearSession);
        debug!("Session cache cleared");
        Some(backend)
    }

    fn read(&self, key: &str, slot: fn(&mut SessionCache) -> &mut Slot) -> Option<String> {
        let Some(backend) = self.backend.get() else {
            debug!(key, "Session manager not initialized");
            return None;
        };

        let mut cache = self.lock_cache();
        let slot = slot(&mut *cache);
        if let Slot::Loaded(value) = &*slot {
            return value.clone();
        }

        let loaded = Self::load_slot(backend.store.as_ref(), key);
        let value = match &loaded {
            Slot::Loaded(value) => value.clone(),
            Slot::Unloaded => None,
        };
        *slot = loaded;
        value
    }

    fn load_slot(store: &dyn KeyValueStore, key: &str) -> Slot {
        match store.get(key) {
            Ok(value) => Slot::Loaded(value),
            Err(e) => {
                warn!(error = %e, key, "Failed to read session value");
                Slot::Unloaded
            }
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, SessionCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counts reads and can be switched into a failing mode
    #[derive(Default)]
    struct ProbeStore {
        inner: MemoryStore,
        reads: AtomicUsize,
        failing: AtomicBool,
    }

    impl ProbeStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("probe".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl KeyValueStore for ProbeStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.check()?;
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.check()?;
            self.inner.remove(key)
        }
        fn clear(&self) -> Result<(), StoreError> {
            self.check()?;
            self.inner.clear()
        }
        fn commit(&self) -> Result<(), StoreError> {
            self.check()
        }
    }

    fn memory_manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionManager::with_store(store.clone()), store)
    }

    #[test]
    fn test_uninitialized_is_inert() {
        let manager = SessionManager::new();
        manager.save_token("abc");
        manager.save_user_role(ORGANIZER_ROLE);
        manager.clear_session();

        assert!(!manager.is_initialized());
        assert_eq!(manager.get_token(), None);
        assert_eq!(manager.get_user_role(), None);
        assert!(!manager.is_logged_in());
        assert!(!manager.has_valid_token());
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = Arc::new(MemoryStore::with_entries([(keys::AUTH_TOKEN, "first")]));
        let second = Arc::new(MemoryStore::with_entries([(keys::AUTH_TOKEN, "second")]));

        let manager = SessionManager::new();
        assert!(manager.init(first));
        assert!(!manager.init(second));
        assert_eq!(manager.get_token().as_deref(), Some("first"));
    }

    #[test]
    fn test_init_loads_existing_session() {
        let store = Arc::new(MemoryStore::with_entries([
            (keys::AUTH_TOKEN, "persisted"),
            (keys::USER_ROLE, ORGANIZER_ROLE),
        ]));
        let manager = SessionManager::with_store(store);
        assert!(manager.is_logged_in());
        assert!(manager.is_organizer());
    }

    #[test]
    fn test_save_token_without_runtime_writes_inline() {
        let (manager, store) = memory_manager();
        manager.save_token("abc123");
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let (manager, _store) = memory_manager();
        manager.save_token("tok1");
        manager.save_token("");
        manager.save_token("   ");
        assert_eq!(manager.get_token().as_deref(), Some("tok1"));
    }

    #[test]
    fn test_blank_token_does_not_log_in() {
        let (manager, _store) = memory_manager();
        manager.save_token("");
        assert!(!manager.is_logged_in());
        assert_eq!(manager.get_token(), None);
    }

    #[test]
    fn test_role_accepts_blank() {
        let (manager, _store) = memory_manager();
        manager.save_user_role("");
        assert_eq!(manager.get_user_role().as_deref(), Some(""));
        assert!(!manager.is_organizer());
    }

    #[test]
    fn test_externally_written_blank_tokens() {
        let empty = Arc::new(MemoryStore::with_entries([(keys::AUTH_TOKEN, "")]));
        let manager = SessionManager::with_store(empty);
        assert!(!manager.is_logged_in());
        assert!(!manager.has_valid_token());

        let spaces = Arc::new(MemoryStore::with_entries([(keys::AUTH_TOKEN, "  ")]));
        let manager = SessionManager::with_store(spaces);
        assert!(manager.is_logged_in());
        assert!(!manager.has_valid_token());
    }

    #[test]
    fn test_cache_hit_skips_store() {
        let store = Arc::new(ProbeStore::default());
        let manager = SessionManager::with_store(store.clone());
        let reads_after_init = store.reads.load(Ordering::SeqCst);

        manager.save_token("abc123");
        assert_eq!(manager.get_token().as_deref(), Some("abc123"));
        assert!(manager.is_logged_in());
        assert_eq!(store.reads.load(Ordering::SeqCst), reads_after_init);
    }

    #[test]
    fn test_failed_eager_load_retries_on_read() {
        let store = Arc::new(ProbeStore::default());
        store.inner.set(keys::AUTH_TOKEN, "late").unwrap();
        store.failing.store(true, Ordering::SeqCst);

        let manager = SessionManager::with_store(store.clone());
        assert_eq!(manager.get_token(), None);

        store.failing.store(false, Ordering::SeqCst);
        assert_eq!(manager.get_token().as_deref(), Some("late"));
    }

    #[test]
    fn test_storage_failures_do_not_escape() {
        let store = Arc::new(ProbeStore::default());
        let manager = SessionManager::with_store(store.clone());
        store.failing.store(true, Ordering::SeqCst);

        manager.save_token("abc");
        manager.save_user_role("usuario");
        manager.clear_session();

        assert_eq!(manager.get_token(), None);
        assert!(!manager.is_logged_in());
    }

    #[test]
    fn test_concurrent_writes_keep_cache_and_store_agreeing() {
        for _ in 0..200 {
            let (manager, store) = memory_manager();
            std::thread::scope(|scope| {
                for i in 0..4 {
                    let manager = &manager;
                    scope.spawn(move || {
                        if i % 2 == 0 {
                            manager.save_token(&format!("tok{}", i));
                        } else {
                            manager.clear_session();
                        }
                    });
                }
            });
            assert_eq!(manager.get_token(), store.get(keys::AUTH_TOKEN).unwrap());
        }
    }

    #[tokio::test]
    async fn test_clear_session_sync_keeps_language() {
        let store = Arc::new(MemoryStore::with_entries([(keys::SELECTED_LANGUAGE, "ca")]));
        let manager = SessionManager::with_store(store.clone());

        manager.save_token("tok1");
        manager.save_user_role(ORGANIZER_ROLE);
        manager.clear_session_sync().await;

        assert!(!manager.is_logged_in());
        assert_eq!(manager.get_user_role(), None);
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::USER_ROLE).unwrap(), None);
        assert_eq!(store.get(keys::SELECTED_LANGUAGE).unwrap().as_deref(), Some("ca"));
    }

    #[tokio::test]
    async fn test_writes_land_in_order() {
        let (manager, store) = memory_manager();
        manager.save_token("one");
        manager.clear_session();
        manager.save_token("two");
        manager.flush().await;

        assert_eq!(manager.get_token().as_deref(), Some("two"));
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_clear_is_not_undone_by_earlier_write() {
        let (manager, store) = memory_manager();
        manager.save_token("stale");
        manager.clear_session_sync().await;

        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
        assert_eq!(manager.get_token(), None);
    }
}
