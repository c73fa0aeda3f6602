//! Explicitly constructed application state.
//!
//! `AppContext` owns the preference store, the session and locale managers and
//! the API client for the lifetime of the application. Components receive what
//! they need from it instead of reaching for globals.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::config::{self, Config};
use crate::locale::LocaleManager;
use crate::session::SessionManager;
use crate::store::{FileStore, KeyValueStore};

pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub locale: Arc<LocaleManager>,
    pub api: ApiClient,
    store_path: Option<PathBuf>,
}

impl AppContext {
    /// Open the preference file in the configured data directory and wire
    /// everything to it.
    ///
    /// An unusable data directory is not fatal: the managers start
    /// uninitialized and the failure is logged.
    pub fn start(config: Config) -> Result<Self> {
        let store = match config.data_dir() {
            Ok(dir) => match FileStore::open_in(&dir) {
                Ok(store) => Some(store),
                Err(e) => {
                    error!(error = %e, dir = %dir.display(), "Preference store unavailable");
                    None
                }
            },
            Err(e) => {
                error!(error = %e, "No data directory, preferences will not persist");
                None
            }
        };

        let store_path = store.as_ref().map(|s| s.path().to_path_buf());
        let store = store.map(|s| Arc::new(s) as Arc<dyn KeyValueStore>);
        let mut context = Self::with_store(config, store, config::platform_locale())?;
        context.store_path = store_path;
        Ok(context)
    }

    /// Build a context over an already opened store (or none)
    pub fn with_store(
        config: Config,
        store: Option<Arc<dyn KeyValueStore>>,
        platform_locale: Option<String>,
    ) -> Result<Self> {
        let session = Arc::new(SessionManager::new());
        match &store {
            Some(store) => {
                session.init(store.clone());
            }
            None => warn!("Session manager left uninitialized"),
        }

        let locale = Arc::new(LocaleManager::new(store, platform_locale));
        let api = ApiClient::new(config.api_base_url.clone(), session.clone())?;

        info!(
            api = %config.api_base_url,
            logged_in = session.is_logged_in(),
            language = locale.get_locale().code(),
            "Application context started"
        );

        Ok(Self {
            config,
            session,
            locale,
            api,
            store_path: None,
        })
    }

    /// Location of the preference file, when file-backed
    pub fn store_path(&self) -> Option<&PathBuf> {
        self.store_path.as_ref()
    }

    /// Commit pending session writes before the process exits
    pub async fn shutdown(self) {
        self.session.flush().await;
        info!("Application context stopped");
    }
}
