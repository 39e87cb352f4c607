//! SQLite-backed storage.
//!
//! Provides persistent storage for:
//! - Named blobs (the encoded settings document)
//! - History of finished sessions

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::{data_dir, BlobStore};
use crate::error::StorageError;
use crate::session::SessionSummary;

/// A finished session as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub in_zone_ms: u64,
    pub out_of_zone_ms: u64,
    pub total_ms: u64,
    pub in_zone_ratio: Option<f64>,
}

/// SQLite database holding blobs and session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/zonekeeper/zonekeeper.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("zonekeeper.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at     TEXT NOT NULL,
                stopped_at     TEXT NOT NULL,
                in_zone_ms     INTEGER NOT NULL,
                out_of_zone_ms INTEGER NOT NULL,
                total_ms       INTEGER NOT NULL,
                in_zone_ratio  REAL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_stopped_at ON sessions(stopped_at);",
        )?;
        Ok(())
    }

    /// Record a finished session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO sessions (started_at, stopped_at, in_zone_ms, out_of_zone_ms, total_ms, in_zone_ratio)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_ts(summary.started_at),
                format_ts(summary.stopped_at),
                millis(summary.in_zone),
                millis(summary.out_of_zone),
                millis(summary.total),
                summary.in_zone_ratio,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, stopped_at, in_zone_ms, out_of_zone_ms, total_ms, in_zone_ratio
             FROM sessions
             ORDER BY stopped_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<f64>>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, started, stopped, in_zone, out_of_zone, total, ratio) = row?;
            records.push(SessionRecord {
                id,
                started_at: parse_ts(&started)?,
                stopped_at: parse_ts(&stopped)?,
                in_zone_ms: in_zone.max(0) as u64,
                out_of_zone_ms: out_of_zone.max(0) as u64,
                total_ms: total.max(0) as u64,
                in_zone_ratio: ratio,
            });
        }
        Ok(records)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, Vec<u8>>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &[u8]) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl BlobStore for Database {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.kv_get(key)?)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        Ok(self.kv_set(key, value)?)
    }
}

fn millis(d: std::time::Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::QueryFailed(format!("invalid timestamp '{value}': {e}")))
}
