//! Persistence layer for storeq
//!
//! Provides:
//! - Connection records (one per dispatched query, append-only)
//! - Filtered reads by store and request-date range
//! - CSV export in the fixed persisted field order

mod csv;
mod record;
mod sqlite;
mod traits;

pub use csv::*;
pub use record::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record {row}: {message}")]
    CorruptRecord { row: i64, message: String },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
