//! Cache manager tests

mod advanced;

use crate::driver::{Capabilities, Driver, EntrySummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use keystone_codec::Document;
use keystone_core::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Driver with the mandatory operations plus `list`
#[derive(Debug, Default)]
pub(super) struct ListOnlyDriver {
    pub entries: DashMap<String, (Document, Option<DateTime<Utc>>)>,
}

#[async_trait]
impl Driver for ListOnlyDriver {
    fn id(&self) -> &str {
        "list-only"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LIST
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
        self.entries
            .insert(key.to_string(), (value.clone(), expires_at));
        Ok(())
    }

    // Hands back expired entries too, so they stay visible until a clean purges them
    async fn get(&self, key: &str) -> Result<Option<Document>> {
        Ok(self.entries.get(key).map(|entry| entry.0.clone()))
    }

    async fn unset(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EntrySummary>> {
        Ok(self
            .entries
            .iter()
            .map(|entry| EntrySummary {
                id: entry.key().clone(),
                created: None,
                expiry: entry.value().1,
            })
            .collect())
    }
}

/// Driver that never loads
#[derive(Debug)]
pub(super) struct OfflineDriver;

#[async_trait]
impl Driver for OfflineDriver {
    fn id(&self) -> &str {
        "offline"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn can_load(&self) -> bool {
        false
    }

    async fn set(&self, _: &str, _: &Document, _: Option<DateTime<Utc>>) -> Result<()> {
        unreachable!("offline driver used after failing to load")
    }

    async fn get(&self, _: &str) -> Result<Option<Document>> {
        unreachable!("offline driver used after failing to load")
    }

    async fn unset(&self, _: &str) -> Result<()> {
        unreachable!("offline driver used after failing to load")
    }
}

/// Driver whose writes block until a permit is released
#[derive(Debug)]
pub(super) struct GatedDriver {
    pub gate: Semaphore,
    pub inner: ListOnlyDriver,
}

impl GatedDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            inner: ListOnlyDriver::default(),
        })
    }
}

#[async_trait]
impl Driver for GatedDriver {
    fn id(&self) -> &str {
        "gated"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
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
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.inner.set(key, value, expires_at).await
    }

    async fn get(&self, key: &str) -> Result<Option<Document>> {
        self.inner.get(key).await
    }

    async fn unset(&self, key: &str) -> Result<()> {
        self.inner.unset(key).await
    }
}

/// Wait until the cache reports `count` pending writes
pub(super) async fn until_pending(cache: &super::Cache, count: usize) {
    while cache.pending_writes() != count {
        tokio::task::yield_now().await;
    }
}
