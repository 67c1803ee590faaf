//! End-to-end cache behaviour over the filesystem driver

use keystone::{Cache, Document, Error, Expiry};
use std::time::Duration;
use tempfile::TempDir;

async fn filesystem_cache(dir: &TempDir) -> keystone::Result<Cache> {
    Cache::builder()
        .drivers(["filesystem"])
        .filesystem_root(dir.path())
        .build()
        .await
}

#[tokio::test]
async fn test_entry_expires_and_file_is_removed() -> keystone::Result<()> {
    let dir = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await?;
    assert_eq!(cache.driver_id(), "filesystem");

    cache.set("greeting", "hello", Some(Expiry::In(Duration::from_secs(1)))).await?;
    assert_eq!(cache.get("greeting").await?, Some(Document::from("hello")));

    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 1);

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    assert_eq!(
        cache.get_or("greeting", "fallback").await?,
        Document::from("fallback")
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    cache.destroy().await?;
    Ok(())
}

#[tokio::test]
async fn test_list_excludes_expired_entries() -> keystone::Result<()> {
    let dir = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await?;

    cache.set("short", 1, Some(Expiry::Millis(100))).await?;
    cache.set("long", 2, Some(Expiry::Relative("1h".into()))).await?;
    cache.set("forever", 3, None).await?;

    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut ids: Vec<String> = cache.list().await?.into_iter().map(|e| e.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["forever", "long"]);

    let forever = cache
        .list()
        .await?
        .into_iter()
        .find(|e| e.id == "forever")
        .unwrap();
    assert_eq!(forever.expiry, None);

    cache.destroy().await?;
    Ok(())
}

#[tokio::test]
async fn test_past_expiry_stores_nothing() -> keystone::Result<()> {
    let dir = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await?;

    let err = cache
        .set("stale", "x", Some(Expiry::Millis(-5_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidExpiry { .. }));
    assert!(!cache.has("stale").await?);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    cache.destroy().await?;
    Ok(())
}

#[tokio::test]
async fn test_destroy_waits_for_writes_started_before_it() -> keystone::Result<()> {
    let dir = TempDir::new().unwrap();
    let cache = filesystem_cache(&dir).await?;

    let writer = {
        let cache = cache.clone();
        tokio::spawn(async move {
            let value = Document::from("x".repeat(256 * 1024));
            cache.set("big", value, None).await
        })
    };
    while cache.pending_writes() == 0 && !writer.is_finished() {
        tokio::task::yield_now().await;
    }

    cache.destroy().await?;
    writer.await.unwrap()?;

    let reopened = filesystem_cache(&dir).await?;
    assert!(reopened.has("big").await?);
    reopened.destroy().await?;
    Ok(())
}

#[tokio::test]
async fn test_cache_refuses_work_after_destroy() -> keystone::Result<()> {
    let cache = Cache::builder().drivers(["memory"]).build().await?;
    cache.set("k", true, None).await?;
    cache.destroy().await?;
    cache.destroy().await?;

    assert!(matches!(
        cache.get("k").await.unwrap_err(),
        Error::Shutdown { .. }
    ));
    Ok(())
}
