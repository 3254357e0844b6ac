//! Error types for device identity management.

use thiserror::Error;

/// Errors raised by a [`crate::KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid key name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that prevent a device identity from being established.
///
/// Corrupt persisted material is not an error: it is replaced by a fresh
/// identity. Only the two conditions below are reported, and a client
/// cannot operate without an identity, so callers treat them as fatal.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("System randomness unavailable: {0}")]
    Randomness(String),

    #[error("Identity storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("Identity serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
