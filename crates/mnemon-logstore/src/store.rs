//! Persistent log storage in `SQLite`.
//!
//! [`LogStore`] owns the `logs` table: it inserts rows on behalf of the
//! [`TeeLayer`](crate::TeeLayer), keeps the table bounded to the newest
//! `max_rows` rows, and serves paginated per-server listings.
//!
//! Writes never fail from the caller's point of view. A broken disk or a
//! locked database loses log rows, it does not break the code that logged.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::pool::{self, ConnectionPool, StoreConfig};
use crate::types::{LogInsert, LogLevel, LogPage, LogRow};

/// Rows kept after each write unless configured otherwise.
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// Page size used by [`LogStore::list`] when `limit` is zero.
pub const DEFAULT_LIST_LIMIT: usize = 100;

const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    ts         DATETIME NOT NULL,
    level      TEXT NOT NULL,
    msg        TEXT NOT NULL,
    server_id  TEXT,
    channel_id TEXT,
    attrs      TEXT
);
CREATE INDEX IF NOT EXISTS idx_logs_server ON logs(server_id);
";

/// Weight of the stored level name. Unknown names weigh the same as INFO.
const LEVEL_WEIGHT_SQL: &str = "CASE level \
     WHEN 'TRACE' THEN -8 \
     WHEN 'DEBUG' THEN -4 \
     WHEN 'INFO' THEN 0 \
     WHEN 'WARN' THEN 4 \
     WHEN 'ERROR' THEN 8 \
     ELSE 0 END";

/// `SQLite`-backed log store.
///
/// Cheap to share behind an `Arc`: every call checks out its own pooled
/// connection, so concurrent writers and readers need no extra locking.
pub struct LogStore {
    pool: ConnectionPool,
    path: PathBuf,
    max_rows: usize,
}

impl LogStore {
    /// Open (or create) the log store at `path` with default settings.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, &StoreConfig::default())
    }

    /// Open (or create) the log store at `path`.
    ///
    /// Creates the parent directory if needed and applies the schema. The
    /// store is only returned once both succeeded.
    ///
    /// The schema is applied on a dedicated connection before the pool is
    /// built, so a path that is not a usable database (a directory, a
    /// foreign file) fails at once with [`StoreError::Migration`] instead of
    /// waiting out the pool's connection timeout.
    pub fn open_with_config(path: &Path, config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        migrate(path, config).map_err(|e| StoreError::Migration {
            message: e.to_string(),
        })?;
        let pool = pool::new_file(path, config)?;

        debug!(path = %path.display(), max_rows = config.max_rows, "log store opened");

        Ok(Self {
            pool,
            path: path.to_owned(),
            max_rows: config.max_rows,
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Retention bound applied after every write.
    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Persist a single log row, then prune.
    ///
    /// Errors are dropped: this sits on the logging path and must never fail
    /// or report through the logging pipeline it is part of.
    pub fn write(&self, record: &LogInsert) {
        let Ok(conn) = self.pool.get() else {
            return;
        };
        if insert_row(&conn, record).is_ok() {
            self.prune(&conn);
        }
    }

    /// Delete every row older than the newest `max_rows`.
    fn prune(&self, conn: &Connection) {
        let _ = prune_rows(conn, self.max_rows);
    }

    /// List rows for `server_id`, newest first.
    ///
    /// `level` restricts the result to rows at least that severe; an empty or
    /// unrecognised level means no restriction. A `limit` of zero means
    /// [`DEFAULT_LIST_LIMIT`]. An empty `server_id` selects rows logged
    /// without a server. [`LogPage::total`] counts every matching row.
    pub fn list(
        &self,
        server_id: &str,
        level: &str,
        limit: usize,
        offset: usize,
    ) -> Result<LogPage> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };

        let mut filter = String::new();
        let mut params: Vec<Value> = Vec::new();

        if server_id.is_empty() {
            filter.push_str("server_id IS NULL");
        } else {
            filter.push_str("server_id = ?");
            params.push(Value::Text(server_id.to_string()));
        }
        if let Some(min) = LogLevel::parse_filter(level) {
            let _ = write!(filter, " AND {LEVEL_WEIGHT_SQL} >= ?");
            params.push(Value::Integer(i64::from(min.weight())));
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let total: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM logs WHERE {filter}"),
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        )?;

        params.push(Value::Integer(to_sql_int(limit)));
        params.push(Value::Integer(to_sql_int(offset)));

        let rows = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id, ts, level, msg, server_id, channel_id, COALESCE(attrs, '') \
                 FROM logs WHERE {filter} ORDER BY id DESC LIMIT ? OFFSET ?"
            ))?;
            let mapped = stmt.query_map(rusqlite::params_from_iter(params.iter()), row_to_log)?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;

        Ok(LogPage {
            rows,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    /// Total number of stored rows across all servers.
    pub fn count(&self) -> Result<u64> {
        let conn = self.pool.get()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}

fn migrate(path: &Path, config: &StoreConfig) -> rusqlite::Result<()> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_millis(u64::from(config.busy_timeout_ms)))?;
    conn.execute_batch(MIGRATION_SQL)
}

fn insert_row(conn: &Connection, record: &LogInsert) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO logs (ts, level, msg, server_id, channel_id, attrs) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(rusqlite::params![
        record.ts,
        record.level.as_str(),
        record.message,
        non_empty(record.server_id.as_deref()),
        non_empty(record.channel_id.as_deref()),
        record.attrs,
    ])
}

fn prune_rows(conn: &Connection, max_rows: usize) -> rusqlite::Result<usize> {
    // Ids are assigned in insertion order, so the cutoff is the id just past
    // the newest `max_rows`.
    let mut stmt = conn.prepare_cached(
        "DELETE FROM logs WHERE id <= \
         (SELECT id FROM logs ORDER BY id DESC LIMIT 1 OFFSET ?1)",
    )?;
    stmt.execute([to_sql_int(max_rows)])
}

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        id: row.get(0)?,
        ts: row.get(1)?,
        level: row.get(2)?,
        msg: row.get(3)?,
        server_id: row.get(4)?,
        channel_id: row.get(5)?,
        attrs: row.get(6)?,
    })
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
