//! DuckDB document backend.
//!
//! All collections share one `documents` table; bodies are stored as JSON
//! text and filtered in process, so the schema never changes when an entity
//! gains a field.

use crate::backend::DocumentBackend;
use crate::error::{StoreError, StoreResult};
use duckdb::{params, Connection};
use habitat_types::EntityId;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection VARCHAR NOT NULL,
    id VARCHAR NOT NULL,
    body VARCHAR NOT NULL
);";

/// Open a DuckDB connection with stale WAL recovery.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once. This handles the common case
/// where an unclean shutdown leaves a WAL file that prevents reopening.
pub fn open_duckdb_with_wal_recovery(path: &Path) -> StoreResult<Connection> {
    match Connection::open(path) {
        Ok(conn) => Ok(conn),
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                warn!(
                    "DuckDB open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    return Connection::open(path).map_err(Into::into);
                }
            }
            Err(first_err.into())
        }
    }
}

/// Document backend persisted in a DuckDB database.
pub struct DuckDbBackend {
    conn: Connection,
}

impl DuckDbBackend {
    /// Opens (or creates) a database file.
    pub fn open(path: &Path) -> StoreResult<Self> {
        debug!("opening DuckDB document backend at {}", path.display());
        Self::init(open_duckdb_with_wal_recovery(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn decode(body: &str) -> StoreResult<Value> {
        serde_json::from_str(body).map_err(|e| StoreError::InvalidData(e.to_string()))
    }
}

impl DocumentBackend for DuckDbBackend {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn insert(&mut self, collection: &str, id: &EntityId, body: &Value) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)",
            params![collection, id.as_str(), body.to_string()],
        )?;
        Ok(())
    }

    fn replace(&mut self, collection: &str, id: &EntityId, body: &Value) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE documents SET body = ? WHERE collection = ? AND id = ?",
            params![body.to_string(), collection, id.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn remove(&mut self, collection: &str, id: &EntityId) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            params![collection, id.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn fetch(&self, collection: &str, id: &EntityId) -> StoreResult<Option<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM documents WHERE collection = ? AND id = ?")?;
        let mut rows = stmt.query_map(params![collection, id.as_str()], |row| {
            row.get::<_, String>(0)
        })?;
        match rows.next() {
            Some(body) => Ok(Some(Self::decode(&body?)?)),
            None => Ok(None),
        }
    }

    fn scan(&self, collection: &str) -> StoreResult<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM documents WHERE collection = ? ORDER BY id")?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
        let mut docs = Vec::new();
        for body in rows {
            docs.push(Self::decode(&body?)?);
        }
        Ok(docs)
    }
}
