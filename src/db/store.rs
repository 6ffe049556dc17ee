//! SQLite history store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Result as SqlResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use super::models::*;
use crate::address::ServerAddress;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
}

struct Inner {
    conn: Connection,
    path: PathBuf,
}

/// Thread-safe, append-only observation store.
///
/// Every operation goes through a health-check-and-retry wrapper: on failure
/// the connection's liveness is verified, a dead connection is reopened, and
/// the operation is retried exactly once before the error surfaces.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
}

impl Store {
    /// Open (creating if needed) the store at the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = open_connection(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { conn, path })),
        })
    }

    /// Append one observation. Rows are never updated after insert.
    pub fn append(&self, obs: &StatusObservation) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO status_history
                 (host, port, checked_at, online_players, response_time_ms, is_online, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    obs.host,
                    obs.port,
                    format_db_time(obs.checked_at),
                    obs.online_players,
                    obs.response_time_ms,
                    obs.status.is_online(),
                    obs.error,
                ],
            )?;
            Ok(())
        })
    }

    /// All observations for an address with `checked_at >= since`, ascending
    /// by time. Empty when nothing matches.
    pub fn query_since(
        &self,
        address: &ServerAddress,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusObservation>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT host, port, checked_at, online_players, response_time_ms, is_online, error_message
                 FROM status_history
                 WHERE host = ?1 AND port = ?2 AND checked_at >= ?3
                 ORDER BY checked_at ASC",
            )?;

            let rows = stmt
                .query_map(
                    params![address.host, address.port, format_db_time(since)],
                    |row| {
                        let time_str: String = row.get(2)?;
                        let is_online: bool = row.get(5)?;
                        Ok(StatusObservation {
                            host: row.get(0)?,
                            port: row.get(1)?,
                            checked_at: parse_db_time(&time_str).unwrap_or_else(Utc::now),
                            online_players: row.get(3)?,
                            response_time_ms: row.get(4)?,
                            status: if is_online {
                                ServerStatus::Online
                            } else {
                                ServerStatus::Offline
                            },
                            error: row.get(6)?,
                        })
                    },
                )?
                .collect::<SqlResult<Vec<_>>>()?;

            Ok(rows)
        })
    }

    /// Delete all observations older than the cutoff, returning the number
    /// of rows removed. Returns 0 when nothing qualifies.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM status_history WHERE checked_at < ?1",
                params![format_db_time(cutoff)],
            )?;
            Ok(deleted as u64)
        })
    }

    /// Global summary independent of address.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        self.with_conn(|conn| {
            let (total, earliest, latest) = conn.query_row(
                "SELECT COUNT(*), MIN(checked_at), MAX(checked_at) FROM status_history",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )?;
            let page_count: i64 = conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;

            Ok(StoreStats {
                total_records: total,
                earliest: earliest.as_deref().and_then(parse_db_time),
                latest: latest.as_deref().and_then(parse_db_time),
                size_bytes: page_count * page_size,
            })
        })
    }

    fn with_conn<T>(
        &self,
        op: impl Fn(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match op(&inner.conn) {
            Ok(v) => Ok(v),
            Err(first) => {
                if !connection_alive(&inner.conn) {
                    tracing::warn!("store connection dead after error ({first}), reopening");
                    inner.conn = open_connection(&inner.path)?;
                }
                op(&inner.conn).map_err(StoreError::from)
            }
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    // WAL lets the poll task and query handlers interleave; the busy timeout
    // makes contending writers block briefly instead of failing.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
        .map_err(|e| StoreError::Migration(format!("Migration 1 failed: {}", e)))?;
    conn.execute_batch(include_str!("../../migrations/000002_time_index.up.sql"))
        .map_err(|e| StoreError::Migration(format!("Migration 2 failed: {}", e)))?;
    Ok(())
}

fn connection_alive(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
}

fn format_db_time(t: DateTime<Utc>) -> String {
    // Fixed-width layout so lexicographic order matches chronological order.
    t.format("%Y-%m-%d %H:%M:%S%.9f").to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [
        "%Y-%m-%d %H:%M:%S%.9f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}
