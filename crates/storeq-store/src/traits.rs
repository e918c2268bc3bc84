//! Store trait definitions

use crate::{ConnectionRecord, RecordFilter, StoreResult};

/// Append-only log of connection records
pub trait RecordStore: Send + Sync {
    /// Append one record. Each record is written atomically.
    fn append(&self, record: &ConnectionRecord) -> StoreResult<()>;

    /// Read matching records in insertion order
    fn read(&self, filter: &RecordFilter) -> StoreResult<Vec<ConnectionRecord>>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
