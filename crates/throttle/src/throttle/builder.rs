//! Throttle construction

use super::Throttle;
use crate::options::QueuePolicy;
use keystone_core::{QueuePolicyKind, ThrottleConfig};
use keystone_lock::Lock;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct ThrottleBuilder {
    lock: Arc<Lock>,
    config: ThrottleConfig,
}

impl ThrottleBuilder {
    pub fn new(lock: Arc<Lock>) -> Self {
        Self {
            lock,
            config: ThrottleConfig::default(),
        }
    }

    pub fn config(mut self, config: &ThrottleConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Default cooldown for options built by [`Throttle::options`]
    pub fn wait(mut self, wait: Duration) -> Self {
        self.config.wait = wait;
        self
    }

    pub fn policy(mut self, policy: QueuePolicy) -> Self {
        match policy {
            QueuePolicy::DropImmediate => self.config.policy = QueuePolicyKind::DropImmediate,
            QueuePolicy::BoundedQueue(depth) => {
                self.config.policy = QueuePolicyKind::BoundedQueue;
                self.config.queue_depth = depth;
            }
        }
        self
    }

    pub fn share_in_flight(mut self, share: bool) -> Self {
        self.config.share_in_flight = share;
        self
    }

    /// How often queued waiters retry a lock held elsewhere
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    pub fn build<T>(self) -> Throttle<T>
    where
        T: Clone + Send + 'static,
    {
        Throttle::assemble(self.lock, self.config)
    }
}
