//! Credential storage for "remember me" logins.
//!
//! `CredentialStore` keeps passwords in the OS keychain via `keyring`,
//! keyed by the account email. Session tokens are not stored here; they live
//! in the preference store managed by `SessionManager`.

pub mod credentials;

pub use credentials::CredentialStore;
