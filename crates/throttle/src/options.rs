//! Per-call throttle options

use keystone_core::{QueuePolicyKind, Result, ThrottleConfig};
use keystone_lock::LockKey;
use std::time::Duration;

/// What happens to a caller that finds the lock already held
///
/// `BoundedQueue(0)` is not the same as `DropImmediate`: the caller is
/// enqueued and then evicted as the oldest entry beyond the bound, so it
/// goes through the queue's eviction path before being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    DropImmediate,
    /// Keep at most this many waiters; older ones are evicted first
    BoundedQueue(usize),
}

impl QueuePolicy {
    pub fn from_config(config: &ThrottleConfig) -> Self {
        match config.policy {
            QueuePolicyKind::DropImmediate => QueuePolicy::DropImmediate,
            QueuePolicyKind::BoundedQueue => QueuePolicy::BoundedQueue(config.queue_depth),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Identifies the operation being throttled
    pub hash: String,
    /// Cooldown after a successful worker before the lock is released
    pub wait: Duration,
    pub policy: QueuePolicy,
    /// Join a running local flight for the same hash instead of contending
    pub share_in_flight: bool,
}

impl ThrottleOptions {
    pub fn new(hash: impl Into<String>) -> Self {
        Self::from_config(hash, &ThrottleConfig::default())
    }

    pub fn from_config(hash: impl Into<String>, config: &ThrottleConfig) -> Self {
        Self {
            hash: hash.into(),
            wait: config.wait,
            policy: QueuePolicy::from_config(config),
            share_in_flight: config.share_in_flight,
        }
    }

    /// Options whose hash is derived from a lock key
    pub fn for_key(key: impl Into<LockKey>, config: &ThrottleConfig) -> Result<Self> {
        Ok(Self::from_config(key.into().hash()?, config))
    }

    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn policy(mut self, policy: QueuePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn share_in_flight(mut self, share: bool) -> Self {
        self.share_in_flight = share;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_codec::Document;
    use serde_json::json;

    #[test]
    fn test_policy_from_config() {
        let mut config = ThrottleConfig::default();
        assert_eq!(QueuePolicy::from_config(&config), QueuePolicy::DropImmediate);

        config.policy = QueuePolicyKind::BoundedQueue;
        config.queue_depth = 0;
        assert_eq!(QueuePolicy::from_config(&config), QueuePolicy::BoundedQueue(0));
    }

    #[test]
    fn test_options_for_structured_key() {
        let config = ThrottleConfig::default();
        let a = ThrottleOptions::for_key(Document::from(json!({"a": 1, "b": 2})), &config).unwrap();
        let b = ThrottleOptions::for_key(Document::from(json!({"b": 2, "a": 1})), &config).unwrap();
        assert_eq!(a.hash, b.hash);
        assert!(a.share_in_flight);

        let plain = ThrottleOptions::new("report").wait(Duration::from_secs(1));
        assert_eq!(plain.hash, "report");
        assert_eq!(plain.wait, Duration::from_secs(1));
    }
}
