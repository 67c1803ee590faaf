//! Reads: `get`, `get_or`, `get_many`, `has`, `size` and the typed `get_value`

use crate::core::types::Cache;
use crate::driver::unsupported;
use crate::driver::Operation;
use crate::plan::{HasStrategy, Support};
use futures::future::join_all;
use indexmap::IndexMap;
use keystone_codec::Document;
use keystone_core::Result;
use keystone_utils::tracing::cache_span;
use serde::de::DeserializeOwned;
use tracing::Instrument;

impl Cache {
    /// Fetch a live entry
    pub async fn get(&self, key: &str) -> Result<Option<Document>> {
        self.ensure_open()?;
        let mangled = self.mangle(key);
        let value = self
            .inner
            .driver
            .get(&mangled)
            .instrument(cache_span("get", self.driver_id()))
            .await?;
        tracing::debug!(
            driver = self.driver_id(),
            key = %mangled,
            hit = value.is_some(),
            "get"
        );
        Ok(value)
    }

    /// Fetch a live entry or return `fallback`
    pub async fn get_or(&self, key: &str, fallback: impl Into<Document>) -> Result<Document> {
        Ok(match self.get(key).await? {
            Some(value) => value,
            None => fallback.into(),
        })
    }

    /// Fetch several keys concurrently
    ///
    /// Every requested key is present in the result, in request order,
    /// mapped to its value or a copy of `fallback`.
    pub async fn get_many<I, K>(
        &self,
        keys: I,
        fallback: impl Into<Document>,
    ) -> Result<IndexMap<String, Document>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let fallback = fallback.into();
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        let values = join_all(keys.iter().map(|key| self.get(key))).await;

        keys.into_iter()
            .zip(values)
            .map(|(key, value)| Ok((key, value?.unwrap_or_else(|| fallback.clone()))))
            .collect()
    }

    /// Fetch and deserialize an entry
    pub async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(document) => document.to_deserialize().map(Some),
            None => Ok(None),
        }
    }

    /// Whether a live entry exists
    pub async fn has(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let mangled = self.mangle(key);
        match self.inner.plan.has {
            HasStrategy::Native => self.inner.driver.has(&mangled).await,
            HasStrategy::ViaGet => Ok(self.inner.driver.get(&mangled).await?.is_some()),
        }
    }

    /// Stored size in bytes of a live entry
    pub async fn size(&self, key: &str) -> Result<Option<u64>> {
        self.ensure_open()?;
        match self.inner.plan.size {
            Support::Native => self.inner.driver.size(&self.mangle(key)).await,
            Support::Unsupported => Err(unsupported(self.driver_id(), Operation::Size)),
        }
    }
}
