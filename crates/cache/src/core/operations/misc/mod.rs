//! Maintenance: `list`, `clean` and `clear`

use crate::core::types::Cache;
use crate::driver::{is_expired, unsupported, EntrySummary, Operation};
use crate::plan::{PurgeStrategy, Support};
use chrono::Utc;
use keystone_core::Result;

impl Cache {
    /// Live entries, keyed by their mangled ids
    pub async fn list(&self) -> Result<Vec<EntrySummary>> {
        self.ensure_open()?;
        self.list_unchecked().await
    }

    /// Purge expired entries
    pub async fn clean(&self) -> Result<()> {
        self.ensure_open()?;
        tracing::debug!(driver = self.driver_id(), strategy = ?self.inner.plan.clean, "clean");
        match self.inner.plan.clean {
            PurgeStrategy::Native => self.inner.driver.clean().await,
            PurgeStrategy::ListAndUnset => {
                let now = Utc::now();
                self.unset_listed(|entry| is_expired(entry.expiry, now)).await
            }
            PurgeStrategy::Unsupported => Err(unsupported(self.driver_id(), Operation::Clean)),
        }
    }

    /// Purge every entry
    pub async fn clear(&self) -> Result<()> {
        self.ensure_open()?;
        tracing::debug!(driver = self.driver_id(), strategy = ?self.inner.plan.clear, "clear");
        match self.inner.plan.clear {
            PurgeStrategy::Native => self.inner.driver.clear().await,
            PurgeStrategy::ListAndUnset => self.unset_listed(|_| true).await,
            PurgeStrategy::Unsupported => Err(unsupported(self.driver_id(), Operation::Clear)),
        }
    }

    async fn list_unchecked(&self) -> Result<Vec<EntrySummary>> {
        match self.inner.plan.list {
            Support::Native => self.inner.driver.list().await,
            Support::Unsupported => Err(unsupported(self.driver_id(), Operation::List)),
        }
    }

    /// Unset listed entries matching `predicate`, by their driver ids
    async fn unset_listed<F>(&self, predicate: F) -> Result<()>
    where
        F: Fn(&EntrySummary) -> bool,
    {
        let mut removed = 0usize;
        for entry in self.list_unchecked().await? {
            if predicate(&entry) {
                self.inner.driver.unset(&entry.id).await?;
                removed += 1;
            }
        }
        tracing::debug!(driver = self.driver_id(), removed, "removed listed entries");
        Ok(())
    }
}
