//! Writes: `set`, `set_many` and the typed `set_value`

use crate::core::types::Cache;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use keystone_codec::Document;
use keystone_core::{Error, Expiry, Result};
use keystone_utils::tracing::cache_span;
use serde::Serialize;
use tracing::Instrument;

impl Cache {
    /// Store a value, optionally expiring
    ///
    /// The expiry is resolved before anything is written; one that is not in
    /// the future fails with [`Error::InvalidExpiry`] and stores nothing.
    /// Returns the stored document.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Document>,
        expiry: Option<Expiry>,
    ) -> Result<Document> {
        let expires_at = resolve_expiry(expiry)?;
        let value = value.into();
        self.write(key, value.clone(), expires_at).await?;
        Ok(value)
    }

    /// Store many values with one shared expiry
    ///
    /// Writes run concurrently and this resolves once every one has
    /// settled. The first failure in input order is returned; writes that
    /// succeeded are kept.
    pub async fn set_many<I, K, V>(&self, entries: I, expiry: Option<Expiry>) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Document>,
    {
        let expires_at = resolve_expiry(expiry)?;
        let writes = entries
            .into_iter()
            .map(|(key, value)| self.write_owned(key.as_ref().to_string(), value.into(), expires_at));

        join_all(writes).await.into_iter().collect()
    }

    /// Store any serializable value
    pub async fn set_value<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expiry: Option<Expiry>,
    ) -> Result<()> {
        let expires_at = resolve_expiry(expiry)?;
        self.write(key, Document::from_serialize(value)?, expires_at)
            .await
    }

    async fn write_owned(
        &self,
        key: String,
        value: Document,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.write(&key, value, expires_at).await
    }

    /// Hand one write to the driver on its own task
    ///
    /// The task holds an in-flight guard, so it keeps running (and keeps
    /// `destroy` waiting) even if the caller stops awaiting.
    async fn write(
        &self,
        key: &str,
        value: Document,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        // Count the write before checking for shutdown so destroy cannot miss it
        let guard = self.inner.in_flight.begin();
        self.ensure_open()?;

        let driver = std::sync::Arc::clone(&self.inner.driver);
        let mangled = self.mangle(key);
        let span = cache_span("set", driver.id());
        tracing::debug!(parent: &span, key = %mangled, expires_at = ?expires_at, "set");

        tokio::spawn(
            async move {
                let _guard = guard;
                driver.set(&mangled, &value, expires_at).await
            }
            .instrument(span),
        )
        .await
        .map_err(|e| Error::worker(format!("cache write task failed: {e}")))?
    }
}

fn resolve_expiry(expiry: Option<Expiry>) -> Result<Option<DateTime<Utc>>> {
    expiry.map(|expiry| expiry.resolve()).transpose()
}
