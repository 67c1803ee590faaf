//! Auto-clean loop

use std::sync::Weak;
use std::time::Duration;

use crate::core::types::{Cache, CacheInner};

/// Sleep, clean, repeat until the cache is dropped or destroyed
pub(super) async fn run(inner: Weak<CacheInner>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;

        // The task must not keep the cache alive
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let cache = Cache { inner };
        if cache.is_destroyed() {
            return;
        }

        tracing::info!(
            driver = cache.driver_id(),
            interval = ?interval,
            "auto clean"
        );
        if let Err(e) = cache.clean().await {
            tracing::warn!(driver = cache.driver_id(), error = %e, "auto clean failed");
        } else {
            tracing::debug!(driver = cache.driver_id(), "auto clean finished");
        }
    }
}
