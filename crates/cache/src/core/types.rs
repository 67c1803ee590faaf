//! Core cache types and structures

use crate::driver::{Driver, DriverDescriptor, Operation};
use crate::plan::OperationPlan;
use keystone_core::{DrainConfig, Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::internal::InFlight;

/// Maps a caller's key to the key handed to the driver
pub type KeyMangler = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Cache manager committed to one driver
///
/// Cheap to clone; clones share the driver, the in-flight counter and the
/// auto-clean task.
#[derive(Clone)]
pub struct Cache {
    pub(super) inner: Arc<CacheInner>,
}

pub(super) struct CacheInner {
    /// The driver every operation goes through
    pub driver: Arc<dyn Driver>,
    /// Probe results for every candidate tried at build time
    pub descriptors: Vec<DriverDescriptor>,
    pub plan: OperationPlan,
    pub key_mangler: KeyMangler,
    pub drain: DrainConfig,
    /// Writes started and not yet settled
    pub in_flight: InFlight,
    /// Set by `destroy`; later operations fail with `Shutdown`
    pub closed: AtomicBool,
    /// Background auto-clean task handle
    pub cleanup_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("driver", &self.inner.driver.id())
            .field("plan", &self.inner.plan)
            .field("in_flight", &self.inner.in_flight.pending())
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Cache {
    /// Id of the driver the cache committed to
    pub fn driver_id(&self) -> &str {
        self.inner.driver.id()
    }

    /// The committed driver
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.inner.driver
    }

    /// Probe results for the candidates tried at build time, in order
    pub fn descriptors(&self) -> &[DriverDescriptor] {
        &self.inner.descriptors
    }

    pub fn plan(&self) -> &OperationPlan {
        &self.inner.plan
    }

    /// Whether an operation is available natively or through a fallback
    pub fn can(&self, operation: Operation) -> bool {
        self.inner.plan.can(operation)
    }

    /// Apply the key mangler
    pub fn mangle(&self, key: &str) -> String {
        (self.inner.key_mangler)(key)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Writes started and not yet settled
    pub fn pending_writes(&self) -> usize {
        self.inner.in_flight.pending()
    }

    pub(super) fn ensure_open(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::shutdown("cache"));
        }
        Ok(())
    }
}
