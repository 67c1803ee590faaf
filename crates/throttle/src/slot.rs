//! Per-hash bookkeeping

use crate::flight::Flight;
use futures::future::BoxFuture;
use keystone_core::{Error, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A worker erased to a boxed future
pub(crate) type Job<T> =
    Box<dyn FnOnce() -> BoxFuture<'static, std::result::Result<T, BoxError>> + Send>;

/// A caller waiting to lead
pub(crate) struct Waiter<T> {
    pub job: Job<T>,
    pub wait: Duration,
    pub reply: oneshot::Sender<Result<T>>,
    /// Local flight other callers joined, if sharing is on
    pub flight: Option<Arc<Flight<T>>>,
}

impl<T: Clone> Waiter<T> {
    /// Fail the caller and everyone who joined it
    pub fn reject(self, error: impl Fn() -> Error) {
        if let Some(flight) = &self.flight {
            flight.complete(Err(Arc::new(error())));
        }
        let _ = self.reply.send(Err(error()));
    }
}

/// State for one hash
pub(crate) struct Slot<T> {
    /// A local waiter holds the lock (running or cooling down)
    pub leading: bool,
    /// Local flight new callers may join
    pub flight: Option<Arc<Flight<T>>>,
    /// Oldest first
    pub queue: VecDeque<Waiter<T>>,
    /// Task retrying the lock for the queue's front
    pub pump: Option<JoinHandle<()>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            leading: false,
            flight: None,
            queue: VecDeque::new(),
            pump: None,
        }
    }
}

impl<T> Slot<T> {
    pub fn is_idle(&self) -> bool {
        !self.leading && self.flight.is_none() && self.queue.is_empty() && self.pump.is_none()
    }

    /// Forget `flight` if it is still the one new callers would join
    pub fn retire(&mut self, flight: Option<&Arc<Flight<T>>>) {
        if let (Some(current), Some(flight)) = (&self.flight, flight) {
            if Arc::ptr_eq(current, flight) {
                self.flight = None;
            }
        }
    }
}
