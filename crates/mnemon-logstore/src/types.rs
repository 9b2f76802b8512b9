//! Log types shared across the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity with the numeric weight used for "at least this severe" filtering.
///
/// Stored in the `level` column by its upper-case name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Finer than debug; only reachable through `tracing`.
    Trace = -8,
    /// Intermediate values, decisions.
    Debug = -4,
    /// Outcomes, summaries.
    Info = 0,
    /// Non-fatal issues.
    Warn = 4,
    /// Errors.
    Error = 8,
}

impl LogLevel {
    /// All levels, least severe first.
    pub const ALL: [Self; 5] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
    ];

    /// Numeric weight for SQL comparisons (higher = more severe).
    #[must_use]
    pub const fn weight(self) -> i32 {
        self as i32
    }

    /// Name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Convert from a tracing level.
    #[must_use]
    pub fn from_tracing(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }

    /// Parse a filter name (`"debug"`, `"warn"`, ...), case-insensitive.
    ///
    /// Returns `None` for the empty string and for unknown names; callers
    /// treat both as "no filter".
    #[must_use]
    pub fn parse_filter(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row to be inserted by [`LogStore::write`](crate::LogStore::write).
#[derive(Clone, Debug)]
pub struct LogInsert {
    /// Time the record was intercepted.
    pub ts: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Log message.
    pub message: String,
    /// Originating server, if known.
    pub server_id: Option<String>,
    /// Originating channel, if known.
    pub channel_id: Option<String>,
    /// Remaining attributes as a compact JSON object, or empty.
    pub attrs: String,
}

impl LogInsert {
    /// A record at `level` with the current time and no context.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            level,
            message: message.into(),
            server_id: None,
            channel_id: None,
            attrs: String::new(),
        }
    }

    /// Attach a server identifier.
    #[must_use]
    pub fn with_server(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// Attach a channel identifier.
    #[must_use]
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }
}

/// A stored log row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// Row ID (insertion order).
    pub id: i64,
    /// Timestamp of the record.
    pub ts: DateTime<Utc>,
    /// Level name as stored (`"INFO"`, `"WARN"`, ...).
    pub level: String,
    /// Log message.
    pub msg: String,
    /// Server identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Channel identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Extra attributes as a JSON object, empty when none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub attrs: String,
}

impl LogRow {
    /// Parsed severity, if the stored name is known.
    pub fn log_level(&self) -> Option<LogLevel> {
        LogLevel::parse_filter(&self.level)
    }

    /// Decoded attributes, if any.
    pub fn attrs_json(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        if self.attrs.is_empty() {
            return None;
        }
        serde_json::from_str(&self.attrs).ok()
    }
}

/// One page of [`LogStore::list`](crate::LogStore::list) results.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogPage {
    /// Rows, newest first.
    pub rows: Vec<LogRow>,
    /// Number of matching rows ignoring limit and offset.
    pub total: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
