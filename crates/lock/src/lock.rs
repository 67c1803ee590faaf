//! The distributed lock

use crate::key::LockKey;
use crate::record::{self, Fields, LockRecord, RecordPatch};
use crate::store::LockStore;
use chrono::{DateTime, TimeDelta, Utc};
use keystone_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Exclusive, expiring locks over a shared [`LockStore`]
#[derive(Debug)]
pub struct Lock {
    pub(crate) store: Arc<dyn LockStore>,
    pub(crate) expiry: Duration,
    pub(crate) ttl: Duration,
    pub(crate) include_keys: bool,
    pub(crate) closed: AtomicBool,
}

impl Lock {
    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The hash a key is stored under
    pub fn hash(&self, key: impl Into<LockKey>) -> Result<String> {
        key.into().hash()
    }

    /// Try to take the lock
    ///
    /// Abandoned records are purged first so a stale holder cannot block
    /// the insert. `true` means the caller now holds the lock. Every other
    /// outcome, a held lock included, is `false`.
    pub async fn create(&self, key: impl Into<LockKey>, fields: Option<Fields>) -> bool {
        let key = key.into();
        match self.try_create(&key, fields.unwrap_or_default()).await {
            Ok(()) => true,
            Err(Error::DuplicateKey { key_hash }) => {
                tracing::debug!(key = %key_hash, "lock already held");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "lock not created");
                false
            }
        }
    }

    async fn try_create(&self, key: &LockKey, fields: Fields) -> Result<()> {
        self.ensure_open()?;
        if let Err(e) = self.clean().await {
            tracing::warn!(error = %e, "clean before lock create failed");
        }

        let key_hash = key.hash()?;
        let now = record::now();
        let meta = if self.include_keys {
            key.fields().unwrap_or_default()
        } else {
            Fields::new()
        };

        self.store
            .insert(LockRecord {
                key_hash: key_hash.clone(),
                created_at: now,
                expires_at: horizon(now, self.expiry)?,
                ttl_at: horizon(now, self.ttl)?,
                fields,
                meta,
            })
            .await?;
        tracing::debug!(key = %key_hash, backend = self.store.backend(), "lock created");
        Ok(())
    }

    /// Whether a live lock is held on `key`
    ///
    /// Records past either horizon count as absent whether or not `clean`
    /// has removed them yet.
    pub async fn exists(&self, key: impl Into<LockKey>) -> Result<bool> {
        self.ensure_open()?;
        let key_hash = key.into().hash()?;
        let exists = self
            .store
            .find(&key_hash)
            .await?
            .is_some_and(|record| record.is_live(Utc::now()));
        tracing::debug!(key = %key_hash, exists, "lock exists");
        Ok(exists)
    }

    /// Heartbeat: push the record's TTL horizon forward
    ///
    /// Returns whether a record was found. The hard expiry is untouched.
    pub async fn alive(&self, key: impl Into<LockKey>) -> Result<bool> {
        self.ensure_open()?;
        let key_hash = key.into().hash()?;
        let ttl_at = horizon(record::now(), self.ttl)?;
        self.store.update(&key_hash, RecordPatch::ttl(ttl_at)).await
    }

    /// Drop the lock; returns whether a record existed
    ///
    /// Never fails. Releasing a lock that is already gone is `false`.
    pub async fn release(&self, key: impl Into<LockKey>) -> bool {
        let key_hash = match key.into().hash() {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(error = %e, "cannot hash lock key for release");
                return false;
            }
        };
        match self.store.delete(&key_hash).await {
            Ok(existed) => {
                tracing::debug!(key = %key_hash, existed, "lock released");
                existed
            }
            Err(e) => {
                tracing::warn!(key = %key_hash, error = %e, "lock release failed");
                false
            }
        }
    }

    /// Delete every record past either horizon
    pub async fn clean(&self) -> Result<u64> {
        self.ensure_open()?;
        let removed = self.store.delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::debug!(removed, "cleaned abandoned locks");
        }
        Ok(removed)
    }

    /// Delete every record; meant for tests and debugging
    pub async fn clear(&self) -> Result<u64> {
        self.ensure_open()?;
        self.store.delete_all().await
    }

    /// The stored record, live or not
    pub async fn get(&self, key: impl Into<LockKey>) -> Result<Option<LockRecord>> {
        self.ensure_open()?;
        self.store.find(&key.into().hash()?).await
    }

    /// Merge fields into an existing record; returns whether one matched
    pub async fn update(&self, key: impl Into<LockKey>, fields: Fields) -> Result<bool> {
        self.ensure_open()?;
        self.store
            .update(&key.into().hash()?, RecordPatch::fields(fields))
            .await
    }

    /// Every stored record
    pub async fn list(&self) -> Result<Vec<LockRecord>> {
        self.ensure_open()?;
        self.store.list().await
    }

    /// Close the store; later calls fail with `Shutdown`
    pub async fn destroy(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!(backend = self.store.backend(), "closing lock store");
        self.store.close().await
    }

    pub fn is_destroyed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::shutdown("lock"));
        }
        Ok(())
    }
}

fn horizon(now: DateTime<Utc>, after: Duration) -> Result<DateTime<Utc>> {
    TimeDelta::from_std(after)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| Error::configuration(format!("lock duration {after:?} is out of range")))
}

#[cfg(test)]
mod tests {
    use crate::{Lock, LockKey, MemoryLockStore, SqliteLockStore};
    use futures::future::join_all;
    use keystone_codec::Document;
    use keystone_core::{Error, Result};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory_lock() -> Lock {
        Lock::builder().store(Arc::new(MemoryLockStore::new())).build_with_store()
    }

    #[tokio::test]
    async fn test_create_release_cycle() -> Result<()> {
        let lock = memory_lock();

        assert!(lock.create("job", None).await);
        assert!(lock.exists("job").await?);
        assert!(!lock.create("job", None).await);

        assert!(lock.release("job").await);
        assert!(!lock.exists("job").await?);
        assert!(!lock.release("job").await);

        assert!(lock.create("job", None).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_create_has_one_winner() -> Result<()> {
        let lock = Arc::new(memory_lock());
        let attempts = (0..8).map(|_| {
            let lock = Arc::clone(&lock);
            async move { lock.create("contended", None).await }
        });

        let results = join_all(attempts).await;
        assert_eq!(results.iter().filter(|won| **won).count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_create_on_sqlite() -> Result<()> {
        let store = Arc::new(SqliteLockStore::open_in_memory("locks")?);
        let lock = Arc::new(Lock::builder().store(store).build_with_store());

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let lock = Arc::clone(&lock);
                tokio::spawn(async move { lock.create("contended", None).await })
            })
            .collect();
        let mut won = 0;
        for task in tasks {
            if task.await.unwrap() {
                won += 1;
            }
        }
        assert_eq!(won, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_ttl_lapse_frees_the_lock() -> Result<()> {
        let lock = Lock::builder()
            .store(Arc::new(MemoryLockStore::new()))
            .ttl(Duration::from_millis(40))
            .build_with_store();

        assert!(lock.create("beat", None).await);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(lock.alive("beat").await?);
        tokio::time::sleep(Duration::from_millis(25)).await;
        // Heartbeat kept it alive past the original TTL
        assert!(lock.exists("beat").await?);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!lock.exists("beat").await?);
        // Not cleaned yet, but a new holder can take it
        assert!(lock.get("beat").await?.is_some());
        assert!(lock.create("beat", None).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_hard_expiry_ignores_heartbeats() -> Result<()> {
        let lock = Lock::builder()
            .store(Arc::new(MemoryLockStore::new()))
            .expiry(Duration::from_millis(30))
            .build_with_store();

        assert!(lock.create("bounded", None).await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(lock.alive("bounded").await?);
        assert!(!lock.exists("bounded").await?);

        assert_eq!(lock.clean().await?, 1);
        assert!(lock.get("bounded").await?.is_none());
        assert!(!lock.alive("bounded").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_structured_keys_and_fields() -> Result<()> {
        let lock = memory_lock();
        let key = Document::from(json!({"user": 7, "task": "sync"}));
        let same = Document::from(json!({"task": "sync", "user": 7}));

        let mut fields = serde_json::Map::new();
        fields.insert("owner".to_string(), json!("worker-1"));
        assert!(lock.create(key.clone(), Some(fields)).await);
        assert!(!lock.create(same.clone(), None).await);

        let record = lock.get(same).await?.unwrap();
        assert_eq!(record.key_hash, lock.hash(key.clone())?);
        assert_eq!(record.fields.get("owner"), Some(&json!("worker-1")));
        assert_eq!(record.meta.get("user"), Some(&json!(7)));

        let mut more = serde_json::Map::new();
        more.insert("progress".to_string(), json!(0.5));
        assert!(lock.update(key.clone(), more).await?);
        let record = lock.get(LockKey::Structured(key)).await?.unwrap();
        assert_eq!(record.fields.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_include_keys_off() -> Result<()> {
        let lock = Lock::builder()
            .store(Arc::new(MemoryLockStore::new()))
            .include_keys(false)
            .build_with_store();

        let key = Document::from(json!({"id": 1}));
        assert!(lock.create(key.clone(), None).await);
        assert!(lock.get(key).await?.unwrap().meta.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_and_destroy() -> Result<()> {
        let lock = memory_lock();
        assert!(lock.create("a", None).await);
        assert!(lock.create("b", None).await);
        assert_eq!(lock.list().await?.len(), 2);
        assert_eq!(lock.clear().await?, 2);

        lock.destroy().await?;
        lock.destroy().await?;
        assert!(!lock.create("a", None).await);
        assert!(matches!(lock.exists("a").await, Err(Error::Shutdown { .. })));
        Ok(())
    }
}
