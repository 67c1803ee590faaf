//! SQLite lock store
//!
//! Any number of processes may open the same database file. The `UNIQUE`
//! constraint on `key_hash` decides which of two racing inserts wins; WAL
//! mode and a busy timeout keep the losers from failing on a locked file.

use super::LockStore;
use crate::record::{Fields, LockRecord, RecordPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keystone_core::{Error, Result};
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const COLUMNS: &str = "key_hash, created_at, expires_at, ttl_at, fields, meta";

pub struct SqliteLockStore {
    conn: Arc<Mutex<Connection>>,
    table: Arc<str>,
    path: Option<PathBuf>,
    closed: AtomicBool,
}

impl std::fmt::Debug for SqliteLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLockStore")
            .field("path", &self.path)
            .field("table", &self.table)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl SqliteLockStore {
    pub const BACKEND: &'static str = "sqlite";

    /// Open (creating if needed) a database file shared with other processes
    pub async fn open(path: impl Into<PathBuf>, table: &str) -> Result<Self> {
        let path = path.into();
        let table = validate_table(table)?;

        let opened = path.clone();
        let created = table.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            if let Some(parent) = opened.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::file_system(parent, "create lock database directory", e)
                })?;
            }
            let conn = Connection::open(&opened).map_err(sql_error("open"))?;
            init_connection(&conn, &created)?;
            Ok(conn)
        })
        .await
        .map_err(|e| Error::store(Self::BACKEND, "open", e.to_string()))??;

        tracing::debug!(path = %path.display(), table, "opened lock database");
        Ok(Self::from_connection(conn, table, Some(path)))
    }

    /// Private in-memory database; exclusion only within this instance
    pub fn open_in_memory(table: &str) -> Result<Self> {
        let table = validate_table(table)?;
        let conn = Connection::open_in_memory().map_err(sql_error("open"))?;
        init_connection(&conn, &table)?;
        Ok(Self::from_connection(conn, table, None))
    }

    fn from_connection(conn: Connection, table: String, path: Option<PathBuf>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.into(),
            path,
            closed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a statement on the blocking pool
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&Connection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::shutdown("sqlite lock store"));
        }
        let conn = Arc::clone(&self.conn);
        let table = Arc::clone(&self.table);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn, &table)
        })
        .await
        .map_err(|e| Error::store(Self::BACKEND, operation, e.to_string()))?
    }
}

fn validate_table(table: &str) -> Result<String> {
    let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
        .map_err(|e| Error::configuration(e.to_string()))?;
    if !pattern.is_match(table) {
        return Err(Error::configuration(format!(
            "invalid lock table name '{table}'"
        )));
    }
    Ok(table.to_string())
}

fn init_connection(conn: &Connection, table: &str) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT).map_err(sql_error("open"))?;
    // Not available for in-memory databases
    if let Err(e) =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
    {
        tracing::debug!(error = %e, "WAL journal mode unavailable");
    }
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            key_hash   TEXT    NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            ttl_at     INTEGER NOT NULL,
            fields     TEXT    NOT NULL DEFAULT '{{}}',
            meta       TEXT    NOT NULL DEFAULT '{{}}'
        );
        CREATE INDEX IF NOT EXISTS {table}_horizons ON {table} (expires_at, ttl_at);"
    ))
    .map_err(sql_error("create table"))
}

fn sql_error(operation: &'static str) -> impl Fn(rusqlite::Error) -> Error {
    move |e| Error::store(SqliteLockStore::BACKEND, operation, e.to_string())
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(index: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(index, millis)
    })
}

fn encode_fields(fields: &Fields) -> Result<String> {
    Ok(serde_json::to_string(fields)?)
}

fn decode_fields(index: usize, text: &str) -> rusqlite::Result<Fields> {
    serde_json::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<LockRecord> {
    Ok(LockRecord {
        key_hash: row.get(0)?,
        created_at: from_millis(1, row.get(1)?)?,
        expires_at: from_millis(2, row.get(2)?)?,
        ttl_at: from_millis(3, row.get(3)?)?,
        fields: decode_fields(4, &row.get::<_, String>(4)?)?,
        meta: decode_fields(5, &row.get::<_, String>(5)?)?,
    })
}

#[async_trait]
impl LockStore for SqliteLockStore {
    fn backend(&self) -> &str {
        Self::BACKEND
    }

    async fn insert(&self, record: LockRecord) -> Result<()> {
        let fields = encode_fields(&record.fields)?;
        let meta = encode_fields(&record.meta)?;
        self.with_conn("insert", move |conn, table| {
            conn.execute(
                &format!("INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    record.key_hash,
                    to_millis(record.created_at),
                    to_millis(record.expires_at),
                    to_millis(record.ttl_at),
                    fields,
                    meta,
                ],
            )
            .map(|_| ())
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::duplicate_key(record.key_hash.clone())
                } else {
                    sql_error("insert")(e)
                }
            })
        })
        .await
    }

    async fn find(&self, key_hash: &str) -> Result<Option<LockRecord>> {
        let key_hash = key_hash.to_string();
        self.with_conn("find", move |conn, table| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM {table} WHERE key_hash = ?1"),
                params![key_hash],
                read_record,
            )
            .optional()
            .map_err(sql_error("find"))
        })
        .await
    }

    async fn update(&self, key_hash: &str, patch: RecordPatch) -> Result<bool> {
        let key_hash = key_hash.to_string();
        self.with_conn("update", move |conn, table| {
            let tx = conn.unchecked_transaction().map_err(sql_error("update"))?;
            let current = tx
                .query_row(
                    &format!("SELECT {COLUMNS} FROM {table} WHERE key_hash = ?1"),
                    params![key_hash],
                    read_record,
                )
                .optional()
                .map_err(sql_error("update"))?;
            let Some(mut record) = current else {
                return Ok(false);
            };

            record.apply(patch);
            tx.execute(
                &format!("UPDATE {table} SET ttl_at = ?2, fields = ?3 WHERE key_hash = ?1"),
                params![key_hash, to_millis(record.ttl_at), encode_fields(&record.fields)?],
            )
            .map_err(sql_error("update"))?;
            tx.commit().map_err(sql_error("update"))?;
            Ok(true)
        })
        .await
    }

    async fn delete(&self, key_hash: &str) -> Result<bool> {
        let key_hash = key_hash.to_string();
        self.with_conn("delete", move |conn, table| {
            conn.execute(
                &format!("DELETE FROM {table} WHERE key_hash = ?1"),
                params![key_hash],
            )
            .map(|rows| rows > 0)
            .map_err(sql_error("delete"))
        })
        .await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let now = to_millis(now);
        self.with_conn("delete expired", move |conn, table| {
            conn.execute(
                &format!("DELETE FROM {table} WHERE expires_at < ?1 OR ttl_at < ?1"),
                params![now],
            )
            .map(|rows| rows as u64)
            .map_err(sql_error("delete expired"))
        })
        .await
    }

    async fn delete_all(&self) -> Result<u64> {
        self.with_conn("delete all", |conn, table| {
            conn.execute(&format!("DELETE FROM {table}"), [])
                .map(|rows| rows as u64)
                .map_err(sql_error("delete all"))
        })
        .await
    }

    async fn list(&self) -> Result<Vec<LockRecord>> {
        self.with_conn("list", |conn, table| {
            let mut statement = conn
                .prepare(&format!(
                    "SELECT {COLUMNS} FROM {table} ORDER BY created_at, key_hash"
                ))
                .map_err(sql_error("list"))?;
            let records = statement
                .query_map([], read_record)
                .map_err(sql_error("list"))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sql_error("list"));
            records
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            // Fold the WAL back into the main file before other processes look at it
            let checkpoint = conn
                .lock()
                .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()));
            if let Err(e) = checkpoint {
                tracing::debug!(error = %e, "wal checkpoint skipped");
            }
        })
        .await
        .map_err(|e| Error::store(Self::BACKEND, "close", e.to_string()))
    }
}
