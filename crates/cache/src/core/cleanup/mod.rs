//! Periodic purge of expired entries

mod background;

use std::sync::Arc;
use std::time::Duration;

use super::types::Cache;

impl Cache {
    /// Start, restart or stop the periodic clean
    ///
    /// `None` or a zero interval stops any running task. Each run is
    /// scheduled only after the previous clean settled, so runs never overlap.
    pub fn auto_clean(&self, interval: Option<Duration>) {
        let mut slot = self.inner.cleanup_handle.lock();
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let Some(interval) = interval.filter(|i| !i.is_zero()) else {
            return;
        };
        if self.is_destroyed() {
            return;
        }

        *slot = Some(tokio::spawn(background::run(
            Arc::downgrade(&self.inner),
            interval,
        )));
    }

    /// Whether a periodic clean task is scheduled
    pub fn is_auto_cleaning(&self) -> bool {
        self.inner
            .cleanup_handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
