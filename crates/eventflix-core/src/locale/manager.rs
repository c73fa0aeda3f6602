use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::store::{keys, KeyValueStore};

use super::Language;

/// How observers should apply a language change.
///
/// Chosen by whoever changes the language; the manager only forwards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Rebind already-rendered strings without rebuilding the view
    #[default]
    InPlace,
    /// Rebuild the hosting view so every string is re-rendered
    Reload,
}

/// Latest language state as seen by observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleChange {
    pub language: Language,
    /// Increases by one on every `set_locale`; 0 for the startup state
    pub version: u64,
    pub apply: ApplyMode,
    pub changed_at: DateTime<Utc>,
}

/// Tracks the selected display language and broadcasts changes.
///
/// The preference is stored under `selected_language`. Without a store the
/// manager still tracks the language for the lifetime of the process.
pub struct LocaleManager {
    store: Option<Arc<dyn KeyValueStore>>,
    platform_locale: Option<String>,
    tx: watch::Sender<LocaleChange>,
}

impl LocaleManager {
    /// `platform_locale` is the host's locale tag (e.g. `ca_ES.UTF-8`), used
    /// when no preference has been saved yet.
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, platform_locale: Option<String>) -> Self {
        if store.is_none() {
            warn!("Locale manager has no store, language preference will not persist");
        }
        let language = Self::resolve_from(store.as_deref(), platform_locale.as_deref())
            .unwrap_or(Language::DEFAULT);
        let (tx, _) = watch::channel(LocaleChange {
            language,
            version: 0,
            apply: ApplyMode::InPlace,
            changed_at: Utc::now(),
        });
        debug!(language = language.code(), "Locale manager initialized");
        Self {
            store,
            platform_locale,
            tx,
        }
    }

    /// Select a language. Unsupported codes select the default instead.
    ///
    /// Persists the choice, updates the current state and notifies
    /// subscribers. Returns the language actually applied.
    pub fn set_locale(&self, code: &str, apply: ApplyMode) -> Language {
        let language = Language::coerce(code);

        match &self.store {
            Some(store) => {
                let result = store
                    .set(keys::SELECTED_LANGUAGE, language.code())
                    .and_then(|_| store.commit());
                if let Err(e) = result {
                    warn!(error = %e, language = language.code(), "Failed to persist language");
                }
            }
            None => debug!("No store, language kept in memory only"),
        }

        self.tx.send_modify(|state| {
            state.language = language;
            state.version += 1;
            state.apply = apply;
            state.changed_at = Utc::now();
        });
        info!(language = language.code(), ?apply, "Language changed");
        language
    }

    /// The selected language: saved preference, else the platform locale,
    /// else the default. Always a supported language.
    pub fn get_locale(&self) -> Language {
        match &self.store {
            Some(_) => self.resolve(),
            None => self.current().language,
        }
    }

    /// Latest emitted state, without touching the store
    pub fn current(&self) -> LocaleChange {
        self.tx.borrow().clone()
    }

    /// Receiver that always holds the latest state.
    /// Intermediate changes are not queued for slow observers.
    pub fn subscribe(&self) -> watch::Receiver<LocaleChange> {
        self.tx.subscribe()
    }

    /// Stream of changes made after this call
    pub fn changes(&self) -> impl Stream<Item = LocaleChange> + Send + 'static {
        stream::unfold(self.subscribe(), |mut rx| async move {
            rx.changed().await.ok()?;
            let change = rx.borrow_and_update().clone();
            Some((change, rx))
        })
    }

    fn resolve(&self) -> Language {
        Self::resolve_from(self.store.as_deref(), self.platform_locale.as_deref())
            .unwrap_or_else(|| self.tx.borrow().language)
    }

    /// None only when the store could not be read
    fn resolve_from(store: Option<&dyn KeyValueStore>, platform_locale: Option<&str>) -> Option<Language> {
        let saved = match store {
            Some(store) => match store.get(keys::SELECTED_LANGUAGE) {
                Ok(saved) => saved,
                Err(e) => {
                    warn!(error = %e, "Failed to read language preference");
                    return None;
                }
            },
            None => None,
        };

        let language = match saved {
            Some(code) => Language::coerce(&code),
            None => platform_locale.and_then(Language::parse).unwrap_or_else(|| {
                debug!(platform = ?platform_locale, "Platform locale unsupported, using default");
                Language::DEFAULT
            }),
        };
        Some(language)
    }
}
