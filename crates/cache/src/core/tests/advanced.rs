//! Concurrency, shutdown and auto-clean tests

use super::{until_pending, GatedDriver};
use crate::core::Cache;
use crate::driver::{Driver, MemoryDriver};
use keystone_codec::{Document, Marshal};
use keystone_core::{DrainConfig, Error, Expiry, Result};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_destroy_waits_for_in_flight_write() -> Result<()> {
    let gated = GatedDriver::new();
    let driver: Arc<dyn Driver> = gated.clone();
    let cache = Cache::builder().drivers([driver]).build().await?;

    let writer = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.set("slow", 1, None).await })
    };
    until_pending(&cache, 1).await;

    let destroyer = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.destroy().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!destroyer.is_finished());
    assert!(cache.is_destroyed());

    gated.gate.add_permits(1);
    destroyer.await.unwrap()?;
    writer.await.unwrap()?;

    assert_eq!(cache.pending_writes(), 0);
    assert_eq!(gated.inner.get("slow").await?, Some(Document::from(1)));
    Ok(())
}

#[tokio::test]
async fn test_write_survives_dropped_caller() -> Result<()> {
    let gated = GatedDriver::new();
    let driver: Arc<dyn Driver> = gated.clone();
    let cache = Cache::builder().drivers([driver]).build().await?;

    let writer = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.set("orphan", "x", None).await })
    };
    until_pending(&cache, 1).await;
    writer.abort();

    gated.gate.add_permits(1);
    cache.destroy().await?;
    assert_eq!(gated.inner.get("orphan").await?, Some(Document::from("x")));
    Ok(())
}

#[tokio::test]
async fn test_drain_timeout() -> Result<()> {
    let gated = GatedDriver::new();
    let driver: Arc<dyn Driver> = gated.clone();
    let cache = Cache::builder()
        .drivers([driver])
        .drain(DrainConfig {
            initial_wait: Duration::from_millis(1),
            max_attempts: 3,
        })
        .build()
        .await?;

    let _writer = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.set("stuck", 1, None).await })
    };
    until_pending(&cache, 1).await;

    match cache.destroy().await {
        Err(Error::DrainTimeout { pending, attempts }) => {
            assert_eq!(pending, 1);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected DrainTimeout, got {other:?}"),
    }

    gated.gate.add_permits(1);
    Ok(())
}

#[tokio::test]
async fn test_operations_after_destroy() -> Result<()> {
    let cache = Cache::builder().build().await?;
    cache.set("k", 1, None).await?;
    cache.destroy().await?;

    assert!(matches!(cache.get("k").await, Err(Error::Shutdown { .. })));
    assert!(matches!(cache.set("k", 2, None).await, Err(Error::Shutdown { .. })));
    assert!(matches!(cache.clean().await, Err(Error::Shutdown { .. })));
    assert_eq!(cache.pending_writes(), 0);

    // Second call is a no-op
    cache.destroy().await?;
    Ok(())
}

#[tokio::test]
async fn test_auto_clean_purges_without_reads() -> Result<()> {
    let memory = Arc::new(MemoryDriver::new(Arc::new(Marshal::default())));
    let driver: Arc<dyn Driver> = memory.clone();
    let cache = Cache::builder()
        .drivers([driver])
        .auto_clean_interval(Some(Duration::from_millis(20)))
        .build()
        .await?;
    assert!(cache.is_auto_cleaning());

    cache
        .set("short", 1, Some(Expiry::Millis(30)))
        .await?;
    cache.set("long", 2, None).await?;
    assert_eq!(memory.len(), 2);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(memory.len(), 1);

    cache.auto_clean(None);
    assert!(!cache.is_auto_cleaning());
    Ok(())
}

#[tokio::test]
async fn test_destroy_stops_auto_clean() -> Result<()> {
    let cache = Cache::builder()
        .auto_clean_interval(Some(Duration::from_millis(10)))
        .build()
        .await?;
    assert!(cache.is_auto_cleaning());

    cache.destroy().await?;
    assert!(!cache.is_auto_cleaning());

    // Restarting on a destroyed cache does nothing
    cache.auto_clean(Some(Duration::from_millis(10)));
    assert!(!cache.is_auto_cleaning());
    Ok(())
}

#[tokio::test]
async fn test_clean_on_init() -> Result<()> {
    let memory = Arc::new(MemoryDriver::new(Arc::new(Marshal::default())));
    memory
        .set(
            "stale",
            &Document::from(1),
            Some(chrono::Utc::now() - chrono::TimeDelta::seconds(1)),
        )
        .await?;
    assert_eq!(memory.len(), 1);

    let driver: Arc<dyn Driver> = memory.clone();
    let _cache = Cache::builder()
        .drivers([driver])
        .clean_on_init(true)
        .build()
        .await?;
    assert!(memory.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_writers() -> Result<()> {
    let cache = Cache::builder().build().await?;
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.set(&format!("k{i}"), i, None).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap()?;
    }
    assert_eq!(cache.list().await?.len(), 16);
    cache.destroy().await?;
    Ok(())
}
