//! In-process driver backed by a concurrent map

use super::{is_expired, Capabilities, Driver, EntrySummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use keystone_codec::{Codec, Document};
use keystone_core::Result;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredEntry {
    /// Encoded value, so later mutation of the caller's document has no effect
    value: Vec<u8>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires_at, now)
    }
}

/// Entries live in this process only
#[derive(Debug)]
pub struct MemoryDriver {
    entries: DashMap<String, StoredEntry>,
    codec: Arc<dyn Codec>,
}

impl MemoryDriver {
    pub const ID: &'static str = "memory";

    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self {
            entries: DashMap::new(),
            codec,
        }
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn id(&self) -> &str {
        Self::ID
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::HAS
            | Capabilities::SIZE
            | Capabilities::LIST
            | Capabilities::CLEAN
            | Capabilities::DESTROY
    }

    async fn can_load(&self) -> bool {
        true
    }

    async fn set(
        &self,
        key: &str,
        value: &Document,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let value = self.codec.encode(value)?;
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                created_at: Utc::now(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Document>> {
        let now = Utc::now();
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return self.codec.decode(&entry.value).map(Some),
        };

        if expired {
            // Only drop the entry we judged; a concurrent set may have replaced it
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn unset(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn size(&self, key: &str) -> Result<Option<u64>> {
        let now = Utc::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.len() as u64))
    }

    async fn list(&self) -> Result<Vec<EntrySummary>> {
        let now = Utc::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| EntrySummary {
                id: entry.key().clone(),
                created: Some(entry.created_at),
                expiry: entry.expires_at,
            })
            .collect())
    }

    async fn clean(&self) -> Result<()> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        tracing::debug!(
            driver = Self::ID,
            removed = before.saturating_sub(self.entries.len()),
            "cleaned expired entries"
        );
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use keystone_codec::Marshal;

    fn driver() -> MemoryDriver {
        MemoryDriver::new(Arc::new(Marshal::default()))
    }

    #[tokio::test]
    async fn test_set_get_unset() -> Result<()> {
        let driver = driver();
        driver.set("a", &Document::from("alpha"), None).await?;

        assert_eq!(driver.get("a").await?, Some(Document::from("alpha")));
        assert!(driver.has("a").await?);
        assert_eq!(driver.size("a").await?, Some("\"alpha\"".len() as u64));

        driver.unset("a").await?;
        assert_eq!(driver.get("a").await?, None);
        assert!(!driver.has("a").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_get_purges() -> Result<()> {
        let driver = driver();
        let past = Utc::now() - TimeDelta::seconds(5);
        driver.set("old", &Document::from(1), Some(past)).await?;
        assert_eq!(driver.len(), 1);

        assert_eq!(driver.get("old").await?, None);
        assert!(driver.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_clean_skip_expired() -> Result<()> {
        let driver = driver();
        let past = Utc::now() - TimeDelta::seconds(5);
        let future = Utc::now() + TimeDelta::hours(1);
        driver.set("live", &Document::from(1), Some(future)).await?;
        driver.set("forever", &Document::from(2), None).await?;
        driver.set("dead", &Document::from(3), Some(past)).await?;

        let mut ids: Vec<_> = driver.list().await?.into_iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["forever", "live"]);

        driver.clean().await?;
        assert_eq!(driver.len(), 2);

        driver.destroy().await?;
        assert!(driver.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_stored_value_is_a_snapshot() -> Result<()> {
        let driver = driver();
        let mut doc = Document::array([1, 2]);
        driver.set("k", &doc, None).await?;

        let root = doc.root().as_node().unwrap();
        doc.push(root, 3.into());

        assert_eq!(driver.get("k").await?, Some(Document::array([1, 2])));
        Ok(())
    }
}
