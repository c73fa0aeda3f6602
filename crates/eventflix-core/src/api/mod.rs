//! REST API client module for the EventFlix backend.
//!
//! This module provides the `ApiClient` for logging in, browsing events,
//! buying tickets and managing the profile. Authenticated requests carry the
//! bearer token held by the `SessionManager`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
