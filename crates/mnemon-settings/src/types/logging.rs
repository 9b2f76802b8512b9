//! Logging settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Rendering of log lines on stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Log output and log database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `SQLite` file every log record is persisted to.
    pub db_path: PathBuf,
    /// Minimum level shown and persisted (an `EnvFilter` directive).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Stderr rendering.
    pub format: LogFormat,
    /// Optional daily-rolling log file, written in addition to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Rows kept in the log database.
    pub max_rows: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            db_path: super::mnemon_home().join("logs.db"),
            level: "info".to_string(),
            format: LogFormat::Compact,
            file: None,
            max_rows: 10_000,
        }
    }
}
