use std::path::Path;

use log::{debug, info};
use rusqlite::{params, Connection};

use super::{RecordStore, StoreError, StoreResult};
use crate::types::PhotoRecord;

/// SQLite-backed record store; one table per collection
pub struct SqliteRecordStore {
    conn: Connection,
    collection: String,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `db_path` and ensure the collection table exists
    pub fn open(db_path: &Path, collection: &str) -> StoreResult<Self> {
        let store = Self::with_connection(Connection::open(db_path)?, collection)?;
        info!(
            "Record store ready at {} (collection: {})",
            db_path.display(),
            store.collection
        );
        Ok(store)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory(collection: &str) -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, collection)
    }

    fn with_connection(conn: Connection, collection: &str) -> StoreResult<Self> {
        validate_collection(collection)?;

        // WAL is a no-op for in-memory databases but harmless there
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 10000;",
        )
        .map_err(|e| StoreError::Initialization(format!("failed to set pragmas: {}", e)))?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                group_name TEXT,
                year INTEGER,
                ingested_at TEXT NOT NULL
            );"
        ))?;

        Ok(Self {
            conn,
            collection: collection.to_string(),
        })
    }

    /// Number of records in the collection
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.collection),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All records in insertion order
    pub fn records(&self) -> StoreResult<Vec<PhotoRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, group_name, year FROM {} ORDER BY id",
            self.collection
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(PhotoRecord {
                name: row.get(0)?,
                group: row.get(1)?,
                year: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

impl RecordStore for SqliteRecordStore {
    fn clear(&mut self) -> StoreResult<()> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {}", self.collection), [])?;
        debug!("Removed {} records from {}", removed, self.collection);
        Ok(())
    }

    fn insert_all(&mut self, records: &[PhotoRecord]) -> StoreResult<usize> {
        let ingested_at = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {} (name, group_name, year, ingested_at) VALUES (?1, ?2, ?3, ?4)",
                self.collection
            ))?;
            for record in records {
                stmt.execute(params![record.name, record.group, record.year, ingested_at])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

/// Collection names end up in SQL, so only plain identifiers are accepted
pub fn validate_collection(collection: &str) -> StoreResult<()> {
    let mut chars = collection.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(collection.to_string()))
    }
}
