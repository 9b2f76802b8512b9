#![allow(missing_docs, unused_results)]

use std::sync::Arc;
use std::thread;

use mnemon_logstore::test_utils::CaptureLayer;
use mnemon_logstore::{LogInsert, LogLevel, LogStore, StoreConfig, TeeLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

fn open(dir: &tempfile::TempDir, max_rows: usize) -> Arc<LogStore> {
    let config = StoreConfig {
        max_rows,
        ..StoreConfig::default()
    };
    Arc::new(LogStore::open_with_config(&dir.path().join("logs.db"), &config).unwrap())
}

#[test]
fn warn_filter_returns_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 100);
    let (capture, logs) = CaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(TeeLayer::new(capture, Arc::clone(&store)));

    tracing::subscriber::with_default(subscriber, || {
        let _guild = tracing::info_span!("guild", server_id = "s1").entered();
        tracing::info!("connected");
        tracing::warn!("slow reply");
        tracing::error!("model call failed");
    });

    assert_eq!(logs.events().len(), 3);
    assert!(logs.has_event(Level::ERROR, "model call failed"));

    let page = store.list("s1", "warn", 10, 0).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].msg, "model call failed");
    assert_eq!(page.rows[0].level, "ERROR");
    assert_eq!(page.rows[1].msg, "slow reply");
    assert!(page.rows[0].id > page.rows[1].id);
}

#[test]
fn concurrent_writers_stay_within_bound() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 25);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..40 {
                    store.write(
                        &LogInsert::new(LogLevel::Info, format!("t{t} m{i}"))
                            .with_server(format!("s{}", t % 2)),
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(store.count().unwrap() <= 25);
    let total = store.list("s0", "", 0, 0).unwrap().total + store.list("s1", "", 0, 0).unwrap().total;
    assert!(total <= 25);
}

#[test]
fn concurrent_tee_subscribers_share_one_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 1_000);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let (capture, _logs) = CaptureLayer::new();
                let subscriber = tracing_subscriber::registry().with(TeeLayer::new(capture, store));
                tracing::subscriber::with_default(subscriber, || {
                    let server = format!("s{t}");
                    let _guild = tracing::info_span!("guild", server_id = %server).entered();
                    for i in 0..10 {
                        tracing::info!(attempt = i, "tick");
                    }
                });
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        let page = store.list(&format!("s{t}"), "info", 0, 0).unwrap();
        assert_eq!(page.total, 10, "server s{t}");
    }
}

#[test]
fn reads_during_writes_see_consistent_pages() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 10_000);
    for i in 0..20 {
        store.write(&LogInsert::new(LogLevel::Warn, format!("m{i}")).with_server("s1"));
    }

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 20..120 {
                store.write(&LogInsert::new(LogLevel::Warn, format!("m{i}")).with_server("s1"));
            }
        })
    };

    for _ in 0..20 {
        let page = store.list("s1", "warn", 5, 0).unwrap();
        assert_eq!(page.rows.len(), 5);
        assert!(page.total >= 20);
        assert!(page.rows.windows(2).all(|w| w[0].id > w[1].id));
    }
    writer.join().unwrap();
    assert_eq!(store.list("s1", "", 0, 0).unwrap().total, 120);
}
