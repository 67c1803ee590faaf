//! The throttle and its per-hash state machine
//!
//! Each hash moves between idle, leading and cooling down. Leadership only
//! changes hands through the lock: a waiter leads once `Lock::create`
//! returns `true` for it, and stops when the lock is released.

mod builder;

pub use builder::ThrottleBuilder;

use crate::flight::{follow, Flight};
use crate::options::{QueuePolicy, ThrottleOptions};
use crate::slot::{BoxError, Job, Slot, Waiter};
use futures::future::BoxFuture;
use futures::FutureExt;
use keystone_core::{Error, Result, ThrottleConfig};
use keystone_lock::Lock;
use keystone_utils::Backoff;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::Instrument;

const ACTIVE_DRAIN_ATTEMPTS: u32 = 12;

/// Runs workers one at a time per hash across every process sharing the lock
pub struct Throttle<T> {
    inner: Arc<ThrottleInner<T>>,
}

impl<T> Clone for Throttle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Throttle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("hashes", &self.inner.slots.lock().len())
            .field("active", &self.inner.active.load(Ordering::SeqCst))
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

struct ThrottleInner<T> {
    lock: Arc<Lock>,
    config: ThrottleConfig,
    slots: Mutex<HashMap<String, Slot<T>>>,
    /// Tasks between a lock attempt and the matching release
    active: AtomicUsize,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl<T> Throttle<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn assemble(lock: Arc<Lock>, config: ThrottleConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ThrottleInner {
                lock,
                config,
                slots: Mutex::new(HashMap::new()),
                active: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                shutdown,
            }),
        }
    }

    /// Options for `hash` taken from this throttle's configuration
    pub fn options(&self, hash: impl Into<String>) -> ThrottleOptions {
        ThrottleOptions::from_config(hash, &self.inner.config)
    }

    pub fn lock(&self) -> &Arc<Lock> {
        &self.inner.lock
    }

    /// Run `worker` unless another flight for the same hash is under way
    ///
    /// Resolves with the worker's result once it finishes (the cooldown and
    /// release carry on in the background), with the shared outcome when
    /// this call joined a local flight, or with `QueueFull` when the policy
    /// turned it away.
    pub async fn throttle<F, Fut, E>(&self, worker: F, options: ThrottleOptions) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.ensure_open()?;
        let ThrottleOptions {
            hash,
            wait,
            policy,
            share_in_flight,
        } = options;

        // The worker is first called inside the future so a panic there is caught too
        let job: Job<T> =
            Box::new(move || async move { worker().await.map_err(Into::into) }.boxed());
        let (reply, outcome) = oneshot::channel();
        let mut waiter = Waiter {
            job,
            wait,
            reply,
            flight: None,
        };

        let joined = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(hash.clone()).or_default();
            match &slot.flight {
                Some(flight) if share_in_flight => Some(flight.join()),
                _ => {
                    if share_in_flight {
                        let flight = Flight::new();
                        slot.flight = Some(Arc::clone(&flight));
                        waiter.flight = Some(flight);
                    }
                    None
                }
            }
        };
        if let Some(joined) = joined {
            tracing::debug!(hash = %hash, "joined local flight");
            return follow(joined, &hash).await;
        }

        // Counted before the task exists so destroy cannot miss it
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        // Detached so a caller that stops awaiting cannot strand the flight
        let span = keystone_utils::tracing::throttle_span(&hash);
        tokio::spawn(
            Arc::clone(&self.inner)
                .acquire(hash, waiter, policy)
                .instrument(span),
        );

        outcome.await.map_err(|_| Error::shutdown("throttle"))?
    }

    /// Waiters queued for `hash`
    pub fn queued(&self, hash: &str) -> usize {
        self.inner
            .slots
            .lock()
            .get(hash)
            .map_or(0, |slot| slot.queue.len())
    }

    /// Whether a local leader holds the lock for `hash`
    pub fn is_leading(&self, hash: &str) -> bool {
        self.inner
            .slots
            .lock()
            .get(hash)
            .is_some_and(|slot| slot.leading)
    }

    /// Reject queued waiters, cut cooldowns short and wait for every lock
    /// attempt and leader to finish
    ///
    /// Running workers are not interrupted. An attempt that wins the lock
    /// after this started releases it without running its worker. The lock
    /// itself stays open; it may be shared with other components.
    pub async fn destroy(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.shutdown.send_replace(true);

        let rejected: Vec<(String, Waiter<T>)> = {
            let mut slots = self.inner.slots.lock();
            slots
                .iter_mut()
                .flat_map(|(hash, slot)| {
                    // Pumps see the shutdown signal; one mid-attempt releases what it wins
                    slot.pump = None;
                    let hash = hash.clone();
                    slot.queue
                        .drain(..)
                        .map(move |waiter| (hash.clone(), waiter))
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        for (hash, waiter) in rejected {
            tracing::debug!(hash = %hash, "rejecting queued waiter on shutdown");
            waiter.reject(|| Error::shutdown("throttle"));
        }

        let attempts = ACTIVE_DRAIN_ATTEMPTS;
        let drain = Backoff::new(Duration::from_millis(10), attempts)
            .with_max_delay(Duration::from_secs(1));
        for delay in drain {
            if self.inner.active.load(Ordering::SeqCst) == 0 {
                break;
            }
            tokio::time::sleep(delay).await;
        }

        let pending = self.inner.active.load(Ordering::SeqCst);
        if pending > 0 {
            tracing::error!(pending, "throttle work still running after destroy");
            return Err(Error::DrainTimeout { pending, attempts });
        }
        tracing::debug!("throttle destroyed");
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::shutdown("throttle"));
        }
        Ok(())
    }
}

impl<T> ThrottleInner<T>
where
    T: Clone + Send + 'static,
{
    /// First attempt for a new waiter: lead, queue or reject
    ///
    /// Takes over the `active` count `throttle` added for this waiter.
    async fn acquire(self: Arc<Self>, hash: String, waiter: Waiter<T>, policy: QueuePolicy) {
        let _active = Active::adopt(&self.active);

        if self.closed.load(Ordering::SeqCst) {
            self.forget(&hash, waiter.flight.as_ref());
            waiter.reject(|| Error::shutdown("throttle"));
            return;
        }

        if self.lock.create(hash.as_str(), None).await {
            if self.closed.load(Ordering::SeqCst) {
                tracing::debug!(hash = %hash, "lock won during shutdown, releasing");
                self.lock.release(hash.as_str()).await;
                self.forget(&hash, waiter.flight.as_ref());
                waiter.reject(|| Error::shutdown("throttle"));
                return;
            }
            self.slots.lock().entry(hash.clone()).or_default().leading = true;
            Arc::clone(&self).lead(hash, waiter).await;
            return;
        }

        match policy {
            QueuePolicy::DropImmediate => {
                tracing::debug!(hash = %hash, "lock held, rejecting");
                self.forget(&hash, waiter.flight.as_ref());
                waiter.reject(|| Error::queue_full(hash.clone()));
            }
            QueuePolicy::BoundedQueue(depth) => {
                let evicted = {
                    let mut slots = self.slots.lock();
                    let slot = slots.entry(hash.clone()).or_default();
                    // Checked under the slots lock, which destroy takes to drain queues
                    if self.closed.load(Ordering::SeqCst) {
                        drop(slots);
                        self.forget(&hash, waiter.flight.as_ref());
                        waiter.reject(|| Error::shutdown("throttle"));
                        return;
                    }
                    slot.queue.push_back(waiter);

                    let mut evicted = Vec::new();
                    while slot.queue.len() > depth {
                        if let Some(oldest) = slot.queue.pop_front() {
                            slot.retire(oldest.flight.as_ref());
                            evicted.push(oldest);
                        }
                    }
                    tracing::debug!(
                        hash = %hash,
                        queued = slot.queue.len(),
                        evicted = evicted.len(),
                        "lock held, queued"
                    );
                    self.ensure_pump(&hash, slot);
                    evicted
                };
                for oldest in evicted {
                    oldest.reject(|| Error::queue_full(hash.clone()));
                }
            }
        }
    }

    /// Run the waiter's worker while holding the lock, then cool down and release
    ///
    /// The caller holds an `active` count for the whole run.
    async fn lead(self: Arc<Self>, hash: String, waiter: Waiter<T>) {
        tracing::info!(hash = %hash, "leading");

        let Waiter {
            job,
            wait,
            reply,
            flight,
        } = waiter;

        let outcome = match AssertUnwindSafe(job()).catch_unwind().await {
            Ok(outcome) => outcome.map_err(Error::worker_with_source),
            Err(panic) => Err(Error::worker(format!(
                "worker panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        let failed = outcome.is_err();
        if let Some(flight) = &flight {
            let shared = match &outcome {
                Ok(value) => Ok(value.clone()),
                Err(e) => Err(Arc::new(Error::worker(e.to_string()))),
            };
            let followers = flight.complete(shared);
            tracing::debug!(hash = %hash, followers, "flight settled");
        }
        if let Err(e) = &outcome {
            tracing::warn!(hash = %hash, error = %e, "throttled worker failed");
        }
        let _ = reply.send(outcome);

        // A failed worker releases at once
        if !failed && !wait.is_zero() {
            self.cool_down(&hash, wait).await;
        }

        self.lock.release(hash.as_str()).await;
        {
            let mut slots = self.slots.lock();
            if let Some(slot) = slots.get_mut(&hash) {
                slot.leading = false;
                slot.retire(flight.as_ref());
                self.ensure_pump(&hash, slot);
                if slot.is_idle() {
                    slots.remove(&hash);
                }
            }
        }
        tracing::debug!(hash = %hash, "released");
    }

    async fn cool_down(&self, hash: &str, wait: Duration) {
        let mut shutdown = self.shutdown.subscribe();
        tracing::debug!(hash = %hash, wait = ?wait, "cooling down");
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.wait_for(|closed| *closed) => {
                tracing::debug!(hash = %hash, "cooldown cut short");
            }
        }
    }

    /// Start the retry pump if waiters are queued and nothing will promote them
    fn ensure_pump(self: &Arc<Self>, hash: &str, slot: &mut Slot<T>) {
        if slot.leading
            || slot.queue.is_empty()
            || slot.pump.is_some()
            || self.closed.load(Ordering::SeqCst)
        {
            return;
        }
        slot.pump = Some(tokio::spawn(Arc::clone(self).pump(hash.to_string())));
    }

    /// Promote the oldest waiter as soon as the lock can be taken
    ///
    /// Boxed because a promoted waiter leads from inside the pump, and a
    /// leader may start the next pump.
    fn pump(self: Arc<Self>, hash: String) -> BoxFuture<'static, ()> {
        async move {
            let mut shutdown = self.shutdown.subscribe();
            loop {
                if self.closed.load(Ordering::SeqCst) {
                    return;
                }

                let active = Active::enter(&self.active);
                if self.lock.create(hash.as_str(), None).await {
                    if self.closed.load(Ordering::SeqCst) {
                        tracing::debug!(hash = %hash, "lock won during shutdown, releasing");
                        self.lock.release(hash.as_str()).await;
                        return;
                    }
                    let next = {
                        let mut slots = self.slots.lock();
                        let slot = slots.entry(hash.clone()).or_default();
                        slot.pump = None;
                        let next = slot.queue.pop_front();
                        slot.leading = next.is_some();
                        next
                    };
                    match next {
                        Some(waiter) => {
                            tracing::debug!(hash = %hash, "promoting queued waiter");
                            Arc::clone(&self).lead(hash, waiter).await;
                        }
                        None => {
                            // Everyone was evicted while the lock was being taken
                            self.lock.release(hash.as_str()).await;
                            self.forget(&hash, None);
                        }
                    }
                    drop(active);
                    return;
                }
                drop(active);

                {
                    let mut slots = self.slots.lock();
                    let slot = slots.entry(hash.clone()).or_default();
                    if slot.queue.is_empty() {
                        slot.pump = None;
                        if slot.is_idle() {
                            slots.remove(&hash);
                        }
                        return;
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.config.retry_interval) => {}
                    _ = shutdown.wait_for(|closed| *closed) => return,
                }
            }
        }
        .boxed()
    }

    /// Drop a rejected flight and the slot if nothing else uses it
    fn forget(&self, hash: &str, flight: Option<&Arc<Flight<T>>>) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(hash) {
            slot.retire(flight);
            if slot.is_idle() {
                slots.remove(hash);
            }
        }
    }
}

/// One unit of the `active` count, given back on drop
struct Active<'a>(&'a AtomicUsize);

impl<'a> Active<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }

    /// Own a unit someone else already added
    fn adopt(counter: &'a AtomicUsize) -> Self {
        Self(counter)
    }
}

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
