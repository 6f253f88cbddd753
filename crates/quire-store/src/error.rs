//! Store errors.

use quire_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    /// Key or record failed to encode or decode.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Continuation token does not belong to this scan.
    #[error("invalid continuation token: {0}")]
    InvalidToken(String),

    /// A backend returned data it should never hold.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A writer panicked while holding the in-memory lock.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    #[error("schema migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
