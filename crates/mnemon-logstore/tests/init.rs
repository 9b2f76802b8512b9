#![allow(missing_docs, unused_results)]

//! Global subscriber installation. Kept in its own test binary because the
//! global default can only be set once per process.

use std::sync::Arc;
use std::time::Duration;

use mnemon_logstore::{LoggingError, StoreConfig, init_subscriber, open_store, pool};
use mnemon_settings::{LogFormat, LoggingSettings};

#[test]
fn init_installs_tee_and_rejects_second_install() {
    let dir = tempfile::tempdir().unwrap();
    let settings = LoggingSettings {
        db_path: dir.path().join("logs.db"),
        level: "info".to_string(),
        format: LogFormat::Json,
        file: Some(dir.path().join("file").join("mnemon.log")),
        max_rows: 100,
    };
    let store = Arc::new(open_store(&settings).unwrap());

    let guard = init_subscriber(&settings, Arc::clone(&store)).unwrap();

    tracing::info!(server_id = "init-s1", channel_id = "c1", "installed");
    tracing::debug!(server_id = "init-s1", "filtered out");

    let page = store.list("init-s1", "", 0, 0).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].msg, "installed");
    assert!(dir.path().join("file").is_dir());

    let second = init_subscriber(&settings, Arc::clone(&store));
    assert!(matches!(second, Err(LoggingError::Init(_))));

    // A failing pool must not report its connection errors into the
    // installed pipeline (and so into a store).
    let failing = StoreConfig {
        connection_timeout: Duration::from_millis(300),
        ..StoreConfig::default()
    };
    assert!(pool::new_file(dir.path(), &failing).is_err());
    std::thread::sleep(Duration::from_millis(100));

    let unscoped = store.list("", "", 0, 0).unwrap();
    assert_eq!(unscoped.total, 0, "{:?}", unscoped.rows);

    drop(guard);
}
