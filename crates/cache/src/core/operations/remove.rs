//! Removal operations

use crate::core::types::Cache;
use futures::future::join_all;
use keystone_core::{Error, Result};
use std::sync::Arc;

impl Cache {
    /// Remove an entry; removing a missing key is not an error
    pub async fn unset(&self, key: &str) -> Result<()> {
        let guard = self.inner.in_flight.begin();
        self.ensure_open()?;

        let driver = Arc::clone(&self.inner.driver);
        let mangled = self.mangle(key);
        tracing::debug!(driver = driver.id(), key = %mangled, "unset");

        tokio::spawn(async move {
            let _guard = guard;
            driver.unset(&mangled).await
        })
        .await
        .map_err(|e| Error::worker(format!("cache unset task failed: {e}")))?
    }

    /// Remove several entries concurrently; the first failure is returned
    pub async fn unset_many<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        join_all(keys.iter().map(|key| self.unset(key)))
            .await
            .into_iter()
            .collect()
    }
}
