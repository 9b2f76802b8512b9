//! `SQLite` connection pool for the log database.
//!
//! Every connection handed out by the pool runs in WAL mode with a busy
//! timeout, so concurrent writers are serialised by `SQLite` itself instead of
//! by a lock in this crate.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Alias for a pooled connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool and retention settings for a [`LogStore`](crate::LogStore).
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Maximum number of rows kept after each write (default: 10 000).
    pub max_rows: usize,
    /// Maximum pool size (default: 8).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
    /// How long a caller waits for a free connection (default: 5s).
    pub connection_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_rows: crate::store::DEFAULT_MAX_ROWS,
            pool_size: 8,
            busy_timeout_ms: 5000,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// `SQLite` pragma customizer that runs on each new connection.
#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};\
             PRAGMA journal_mode = WAL;\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

/// Create a file-backed connection pool.
///
/// Connection errors are not reported through `log`: with the `tracing-log`
/// bridge installed they would reach the store's own tee and be written back
/// through this pool.
pub fn new_file(path: &Path, config: &StoreConfig) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.connection_timeout)
        .error_handler(Box::new(r2d2::NopErrorHandler))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)?;
    Ok(pool)
}

/// Journal mode reported by a connection (`"wal"` for file databases).
pub fn journal_mode(conn: &Connection) -> Result<String> {
    Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
