//! Append-only forecast history.
//!
//! `HistoryStore` abstracts the persistence medium; `SqliteHistoryStore` is
//! the local SQLite implementation.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::types::{ForecastRecord, ForecastSummary, HistoryRecord, HistoryResult};

/// Sink and source for forecast history.
///
/// Records are never updated or deleted; ids and capture times are assigned
/// by the store.
pub trait HistoryStore: Send + Sync {
    /// Append one record. Returns the assigned id.
    fn insert(&self, record: &ForecastRecord) -> HistoryResult<i64>;

    /// All records, most recently inserted first.
    fn list_all(&self) -> HistoryResult<Vec<HistoryRecord>>;

    /// Append every persistable record of a summary. A failed summary
    /// stores nothing.
    fn insert_summary(&self, summary: &ForecastSummary) -> HistoryResult<usize> {
        let records = summary.persistable();
        for record in records {
            self.insert(record)?;
        }
        Ok(records.len())
    }
}

/// SQLite-backed history. One connection is opened and reused.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the history database at `path`.
    ///
    /// # Errors
    /// Returns [`crate::HistoryError`] if the parent directory cannot be
    /// created or the database cannot be opened and initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> HistoryResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn)?;
        tracing::info!("Opened forecast history at {}", path.display());
        Ok(store)
    }

    /// Open a throwaway in-memory history.
    ///
    /// # Errors
    /// Returns [`crate::HistoryError`] if the schema cannot be created.
    pub fn open_in_memory() -> HistoryResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> HistoryResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> HistoryResult<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS forecast_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                area_name TEXT NOT NULL,
                weather TEXT NOT NULL,
                precipitation TEXT NOT NULL,
                captured_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn insert_with(conn: &Connection, record: &ForecastRecord, captured_at: i64) -> HistoryResult<i64> {
        conn.execute(
            "INSERT INTO forecast_history (area_name, weather, precipitation, captured_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.area_name,
                record.weather_text,
                record.precipitation_text,
                captured_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<HistoryRecord> {
        let captured_ms: i64 = row.get(4)?;
        Ok(HistoryRecord {
            id: row.get(0)?,
            area_name: row.get(1)?,
            weather_text: row.get(2)?,
            precipitation_text: row.get(3)?,
            captured_at: DateTime::from_timestamp_millis(captured_ms).unwrap_or_default(),
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn insert(&self, record: &ForecastRecord) -> HistoryResult<i64> {
        let conn = self.conn.lock();
        Self::insert_with(&conn, record, Utc::now().timestamp_millis())
    }

    fn list_all(&self) -> HistoryResult<Vec<HistoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, area_name, weather, precipitation, captured_at
            FROM forecast_history
            ORDER BY id DESC
            "#,
        )?;

        let rows = stmt.query_map([], Self::row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_summary(&self, summary: &ForecastSummary) -> HistoryResult<usize> {
        let records = summary.persistable();
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let captured_at = Utc::now().timestamp_millis();
        for record in records {
            Self::insert_with(&tx, record, captured_at)?;
        }
        tx.commit()?;

        tracing::debug!("Stored {} forecast records in history", records.len());
        Ok(records.len())
    }
}
