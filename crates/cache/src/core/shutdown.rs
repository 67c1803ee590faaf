//! Cache teardown

use keystone_core::{Error, Result};
use keystone_utils::Backoff;
use std::sync::atomic::Ordering;

use super::types::Cache;
use crate::plan::DestroyStrategy;

impl Cache {
    /// Release the driver and wait for in-flight writes
    ///
    /// Every later operation fails with [`Error::Shutdown`]. Pending writes
    /// are polled with exponential backoff; once the attempts are used up
    /// the call returns [`Error::DrainTimeout`]. Calling it again is a no-op.
    pub async fn destroy(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.auto_clean(None);

        let released = match self.inner.plan.destroy {
            DestroyStrategy::Native => self.inner.driver.destroy().await,
            DestroyStrategy::Noop => Ok(()),
        };
        if let Err(e) = &released {
            tracing::warn!(driver = self.driver_id(), error = %e, "driver destroy failed");
        }

        self.drain().await?;
        tracing::info!(driver = self.driver_id(), "cache destroyed");
        released
    }

    async fn drain(&self) -> Result<()> {
        if self.pending_writes() == 0 {
            return Ok(());
        }

        let drain = &self.inner.drain;
        for delay in Backoff::new(drain.initial_wait, drain.max_attempts) {
            tracing::debug!(
                driver = self.driver_id(),
                pending = self.pending_writes(),
                delay = ?delay,
                "waiting for in-flight writes"
            );
            tokio::time::sleep(delay).await;
            if self.pending_writes() == 0 {
                return Ok(());
            }
        }

        let pending = self.pending_writes();
        tracing::error!(
            driver = self.driver_id(),
            pending,
            attempts = drain.max_attempts,
            "in-flight writes did not drain"
        );
        Err(Error::DrainTimeout {
            pending,
            attempts: drain.max_attempts,
        })
    }
}
