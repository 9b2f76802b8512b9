//! Error types for the log store.
//!
//! Setup errors ([`StoreError::Io`], [`StoreError::Pool`],
//! [`StoreError::Migration`]) make the store unusable and are returned from
//! [`LogStore::open`](crate::LogStore::open). Read errors are returned from
//! [`LogStore::list`](crate::LogStore::list). Write and prune errors are never
//! surfaced.

use thiserror::Error;

/// Errors that can occur during log store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database directory could not be created.
    #[error("create log db dir: {0}")]
    Io(#[from] std::io::Error),

    /// No pooled connection could be checked out.
    #[error("log db connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// The file could not be opened as a database or the schema could not
    /// be applied.
    #[error("log db migration: {message}")]
    Migration {
        /// Describes what failed.
        message: String,
    },

    /// `SQLite` error during a query.
    #[error("log db query: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber was already installed.
    #[error("install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// The log file directory could not be created.
    #[error("create log file dir: {0}")]
    Io(#[from] std::io::Error),

    /// The rolling log file could not be opened.
    #[error("open log file: {0}")]
    File(#[from] tracing_appender::rolling::InitError),
}

/// Convenience type alias for log store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
