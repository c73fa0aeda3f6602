//! Core library for the EventFlix client.
//!
//! Provides the session and locale state shared by every screen, the
//! preference store they persist to, and a thin client for the EventFlix
//! REST API.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use eventflix_core::{AppContext, ApplyMode, Config};
//!
//! let ctx = AppContext::start(Config::load()?)?;
//! ctx.api.login("ana@example.com", "secret1").await?;
//! ctx.locale.set_locale("ca", ApplyMode::InPlace);
//! ctx.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod locale;
pub mod models;
pub mod session;
pub mod store;
pub mod validation;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use context::AppContext;
pub use error::StoreError;
pub use locale::{ApplyMode, Language, LocaleChange, LocaleManager};
pub use session::SessionManager;
pub use store::{FileStore, KeyValueStore, MemoryStore};
