//! Display language selection.
//!
//! - `Language`: the supported language codes and their validation
//! - `LocaleManager`: durable preference plus a "latest value" change signal
//!
//! The language preference is independent of the session and survives logout.

pub mod language;
pub mod manager;

pub use language::Language;
pub use manager::{ApplyMode, LocaleChange, LocaleManager};
