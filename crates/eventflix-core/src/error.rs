use thiserror::Error;

/// Failures of the durable key-value store.
///
/// These never cross the public boundary of the session and locale managers,
/// which log them and fall back to safe defaults.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt preference file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
