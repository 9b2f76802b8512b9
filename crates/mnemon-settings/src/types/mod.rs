//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Sections marked `#[serde(default)]`
//! accept partial JSON: missing fields keep their default.

mod logging;
mod response;

pub use logging::*;
pub use response::*;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Directory holding mnemon's settings and databases (`~/.mnemon`).
pub fn mnemon_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".mnemon")
}

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "logging": { "level": "debug", "maxRows": 50000 },
///   "response": { "defaultMode": "mention" },
///   "agents": [{ "serverId": "123", "responseMode": "all" }]
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MnemonSettings {
    /// Log output and log database.
    pub logging: LoggingSettings,
    /// Global response behaviour.
    pub response: ResponseSettings,
    /// Per-server overrides.
    pub agents: Vec<AgentSettings>,
    /// Retry schedule for model calls.
    pub retry: RetrySettings,
}

/// Retry schedule for model calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Delay before each retry, in milliseconds. The call is attempted
    /// `delaysMs.len() + 1` times.
    pub delays_ms: Vec<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            delays_ms: vec![1000, 2000, 4000],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
