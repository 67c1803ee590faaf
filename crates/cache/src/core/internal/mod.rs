//! Internal bookkeeping shared by the cache operations

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counter of writes that have started and not yet settled
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    /// Count a write until the returned guard is dropped
    pub fn begin(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(&self.0))
    }

    pub fn pending(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decrements its [`InFlight`] counter on drop
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
