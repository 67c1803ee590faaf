//! Lock and throttle working together across handles that share a store

use keystone::core::{LockBackend, LockConfig};
use keystone::{Lock, LockKey, QueuePolicy, ThrottleBuilder};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Serialize)]
struct Job {
    name: &'static str,
    shard: u32,
}

fn sqlite_config(dir: &TempDir) -> LockConfig {
    let mut config = LockConfig::default();
    config.backend = LockBackend::Sqlite;
    config.sqlite.path = Some(dir.path().join("locks.db"));
    config
}

#[tokio::test]
async fn test_two_handles_exclude_each_other() -> keystone::Result<()> {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir);
    let first = Lock::from_config(&config).await?;
    let second = Lock::from_config(&config).await?;

    let key = LockKey::structured(&Job {
        name: "reindex",
        shard: 3,
    })?;
    assert!(first.create(key.clone(), None).await);
    assert!(!second.create(key.clone(), None).await);
    assert!(second.exists(key.clone()).await?);

    let record = second.get(key.clone()).await?.unwrap();
    assert_eq!(record.key_hash, first.hash(key.clone())?);
    assert_eq!(record.meta.get("name"), Some(&serde_json::json!("reindex")));
    assert_eq!(record.meta.get("shard"), Some(&serde_json::json!(3)));

    assert!(first.release(key.clone()).await);
    assert!(second.create(key, None).await);

    first.destroy().await?;
    second.destroy().await?;
    Ok(())
}

#[tokio::test]
async fn test_throttles_on_separate_handles_run_once() -> keystone::Result<()> {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir);
    let runs = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let lock = Arc::new(Lock::from_config(&config).await?);
        handles.push(
            ThrottleBuilder::new(lock)
                .wait(Duration::from_millis(500))
                .policy(QueuePolicy::DropImmediate)
                .build::<u32>(),
        );
    }

    let mut outcomes = Vec::new();
    for throttle in &handles {
        let runs = Arc::clone(&runs);
        let options = throttle.options("nightly-report");
        outcomes.push(
            throttle
                .throttle(
                    move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, std::io::Error>(7)
                    },
                    options,
                )
                .await,
        );
    }

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(outcomes[0].as_ref().ok(), Some(&7));
    assert!(matches!(
        outcomes[1],
        Err(keystone::Error::QueueFull { .. })
    ));

    for throttle in &handles {
        throttle.destroy().await?;
        throttle.lock().destroy().await?;
    }
    Ok(())
}
