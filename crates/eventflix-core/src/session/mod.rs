//! Session state for the signed-in user.
//!
//! This module provides:
//! - `SessionManager`: cached access to the auth token and user role
//! - a background writer that persists session changes in submission order
//!
//! Reads are served from memory. Writes update memory first and are made
//! durable asynchronously, with committed variants for callers that must
//! know the store has caught up.

pub mod manager;
mod writer;

pub use manager::{SessionManager, ORGANIZER_ROLE};
