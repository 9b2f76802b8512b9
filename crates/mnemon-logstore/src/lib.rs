//! # mnemon-logstore
//!
//! Persistent, queryable log storage for mnemon.
//!
//! - [`LogStore`]: `SQLite` table of log rows, bounded to the newest
//!   `max_rows`, listed per server with level filtering and pagination
//! - [`TeeLayer`]: a `tracing` layer that forwards every record to an inner
//!   layer and persists it, carrying `server_id`/`channel_id` from spans
//! - [`init_subscriber`]: installs the global subscriber (stderr plus the
//!   store, optionally a rolling file)
//!
//! # Usage
//!
//! ```no_run
//! let settings = mnemon_settings::load_settings()?;
//! let store = std::sync::Arc::new(mnemon_logstore::open_store(&settings.logging)?);
//! let _guard = mnemon_logstore::init_subscriber(&settings.logging, store)?;
//!
//! let guild = tracing::info_span!("guild", server_id = "123").entered();
//! tracing::warn!(channel_id = "456", "rate limited");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod layer;
pub mod pool;
pub mod store;
pub mod test_utils;
pub mod types;

pub use errors::{LoggingError, Result, StoreError};
pub use layer::{CHANNEL_ID_FIELD, SERVER_ID_FIELD, Scope, TeeLayer};
pub use pool::StoreConfig;
pub use store::{DEFAULT_LIST_LIMIT, DEFAULT_MAX_ROWS, LogStore};
pub use types::{LogInsert, LogLevel, LogPage, LogRow};

use std::path::Path;
use std::sync::Arc;

use mnemon_settings::{LogFormat, LoggingSettings};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Keeps background log writers alive.
///
/// Dropping the guard flushes and stops the rolling-file writer, so hold it
/// for the lifetime of the process.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Open the log store described by `settings`.
pub fn open_store(settings: &LoggingSettings) -> Result<LogStore> {
    let config = StoreConfig {
        max_rows: settings.max_rows,
        ..StoreConfig::default()
    };
    LogStore::open_with_config(&settings.db_path, &config)
}

/// Level filter: `RUST_LOG` when set, otherwise `level`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

type Base = Layered<EnvFilter, Registry>;

/// Install the global tracing subscriber.
///
/// Every record that passes the level filter is written to stderr (compact
/// or JSON) and persisted in `store`. When `settings.file` is set, records
/// are also appended to a daily-rolling file next to it.
///
/// Fails if a global subscriber is already installed.
pub fn init_subscriber(
    settings: &LoggingSettings,
    store: Arc<LogStore>,
) -> std::result::Result<LoggingGuard, LoggingError> {
    let filter = build_filter(&settings.level);

    let stderr: Box<dyn Layer<Base> + Send + Sync> = match settings.format {
        LogFormat::Compact => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .boxed(),
    };

    let (file_layer, file_guard) = match settings.file.as_deref() {
        Some(path) => {
            let (writer, guard) = rolling_writer(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(TeeLayer::new(stderr, store))
        .with(file_layer)
        .try_init()?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn rolling_writer(
    path: &Path,
) -> std::result::Result<(NonBlocking, WorkerGuard), LoggingError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let prefix = path
        .file_name()
        .map_or_else(|| "mnemon.log".to_string(), |n| n.to_string_lossy().into_owned());

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .build(dir)?;
    Ok(tracing_appender::non_blocking(appender))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
