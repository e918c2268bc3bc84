//! SQLite-based store implementation

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use storeq_util::{
    format_date_key, format_iso_date, ConnectionId, StoreId, UserId, DATE_KEY_FORMAT,
    ISO_DATE_FORMAT, TIME_FORMAT,
};
use tracing::{debug, warn};

use crate::{ConnectionRecord, RecordFilter, RecordStore, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        // Dates are stored as ISO / compact keys so lexical order is chronological
        conn.execute_batch(
            r#"
            -- Connection log (append-only)
            CREATE TABLE IF NOT EXISTS connection_records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id TEXT NOT NULL,
                store_id TEXT NOT NULL,
                queried_date TEXT NOT NULL,
                request_date TEXT NOT NULL,
                request_time TEXT NOT NULL,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_records_store ON connection_records(store_id);
            CREATE INDEX IF NOT EXISTS idx_records_request_date ON connection_records(request_date);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(i64, [String; 7])> {
    Ok((
        row.get(0)?,
        [
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ],
    ))
}

fn decode_record(seq: i64, columns: [String; 7]) -> StoreResult<ConnectionRecord> {
    let corrupt = |message: String| StoreError::CorruptRecord { row: seq, message };
    let [connection_id, store_id, queried_date, request_date, request_time, user_id, status] =
        columns;

    Ok(ConnectionRecord {
        connection_id: ConnectionId::new(connection_id),
        store_id: StoreId::new(store_id),
        queried_date: NaiveDate::parse_from_str(&queried_date, DATE_KEY_FORMAT)
            .map_err(|e| corrupt(format!("queried_date '{}': {}", queried_date, e)))?,
        request_date: NaiveDate::parse_from_str(&request_date, ISO_DATE_FORMAT)
            .map_err(|e| corrupt(format!("request_date '{}': {}", request_date, e)))?,
        request_time: NaiveTime::parse_from_str(&request_time, TIME_FORMAT)
            .map_err(|e| corrupt(format!("request_time '{}': {}", request_time, e)))?,
        user_id: UserId::new(user_id),
        status: status.parse().map_err(corrupt)?,
    })
}

impl RecordStore for SqliteStore {
    fn append(&self, record: &ConnectionRecord) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO connection_records
                (connection_id, store_id, queried_date, request_date, request_time, user_id, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.connection_id.as_str(),
                record.store_id.as_str(),
                format_date_key(record.queried_date),
                format_iso_date(record.request_date),
                record.request_time.format(TIME_FORMAT).to_string(),
                record.user_id.as_str(),
                record.status.as_str(),
            ],
        )?;

        debug!(
            seq = conn.last_insert_rowid(),
            connection_id = %record.connection_id,
            store_id = %record.store_id,
            "Connection record appended"
        );

        Ok(())
    }

    fn read(&self, filter: &RecordFilter) -> StoreResult<Vec<ConnectionRecord>> {
        let conn = self.lock()?;

        let store_id = filter.store_id.as_ref().map(|s| s.as_str().to_string());
        let start = filter
            .date_range
            .and_then(|r| r.start)
            .map(format_iso_date);
        let end = filter.date_range.and_then(|r| r.end).map(format_iso_date);

        let mut stmt = conn.prepare(
            r#"
            SELECT seq, connection_id, store_id, queried_date, request_date,
                   request_time, user_id, status
            FROM connection_records
            WHERE (?1 IS NULL OR store_id = ?1)
              AND (?2 IS NULL OR request_date >= ?2)
              AND (?3 IS NULL OR request_date <= ?3)
            ORDER BY seq ASC
            "#,
        )?;

        let rows = stmt.query_map(params![store_id, start, end], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            let (seq, columns) = row?;
            records.push(decode_record(seq, columns)?);
        }

        debug!(count = records.len(), "Connection records read");
        Ok(records)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DateRange, RecordStatus};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_record(conn: &str, store: &str, request_date: NaiveDate) -> ConnectionRecord {
        ConnectionRecord {
            connection_id: ConnectionId::new(conn),
            store_id: StoreId::new(store),
            queried_date: date(2024, 8, 20),
            request_date,
            request_time: NaiveTime::from_hms_opt(14, 30, 5).unwrap(),
            user_id: UserId::new("1001"),
            status: RecordStatus::Success,
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
        assert!(store.read(&RecordFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn test_append_and_read_back() {
        let store = SqliteStore::in_memory().unwrap();
        let record = make_record("c1", "KFC004", date(2024, 8, 27));

        store.append(&record).unwrap();

        let records = store.read(&RecordFilter::all()).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_reads_preserve_insertion_order() {
        let store = SqliteStore::in_memory().unwrap();
        store.append(&make_record("c1", "KFC004", date(2024, 8, 27))).unwrap();
        store.append(&make_record("c2", "KFC001", date(2024, 8, 25))).unwrap();
        store.append(&make_record("c3", "KFC004", date(2024, 8, 26))).unwrap();

        let ids: Vec<_> = store
            .read(&RecordFilter::all())
            .unwrap()
            .into_iter()
            .map(|r| r.connection_id.to_string())
            .collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
    }

    #[test]
    fn test_filters() {
        let store = SqliteStore::in_memory().unwrap();
        store.append(&make_record("c1", "KFC004", date(2024, 7, 31))).unwrap();
        store.append(&make_record("c2", "KFC004", date(2024, 8, 1))).unwrap();
        store.append(&make_record("c3", "KFC001", date(2024, 8, 15))).unwrap();
        store.append(&make_record("c4", "KFC004", date(2024, 8, 31))).unwrap();
        store.append(&make_record("c5", "KFC004", date(2024, 9, 1))).unwrap();

        let by_store = store
            .read(&RecordFilter::all().for_store(StoreId::new("KFC001")))
            .unwrap();
        assert_eq!(by_store.len(), 1);
        assert_eq!(by_store[0].connection_id.as_str(), "c3");

        let august = DateRange::between(date(2024, 8, 1), date(2024, 8, 31));
        let in_range = store.read(&RecordFilter::all().within(august)).unwrap();
        assert_eq!(in_range.len(), 3);

        let both = store
            .read(&RecordFilter::all().for_store(StoreId::new("KFC004")).within(august))
            .unwrap();
        let ids: Vec<_> = both.iter().map(|r| r.connection_id.as_str()).collect();
        assert_eq!(ids, ["c2", "c4"]);

        let none = store
            .read(&RecordFilter::all().for_store(StoreId::new("ABC999")))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(&make_record("c1", "KFC004", date(2024, 8, 27))).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.read(&RecordFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends_each_land_once() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..10 {
                        let conn = format!("c{}-{}", i, j);
                        store
                            .append(&make_record(&conn, "KFC004", date(2024, 8, 27)))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let records = store.read(&RecordFilter::all()).unwrap();
        assert_eq!(records.len(), 80);

        let mut ids: Vec<_> = records.iter().map(|r| r.connection_id.to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 80);
    }
}
