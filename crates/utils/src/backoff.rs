//! Exponential backoff and retry helpers
//!
//! Used by swap-file writes around renames and mtime stamping (which can fail
//! transiently on busy volumes), and by `Cache::destroy` and
//! `Throttle::destroy` while they wait for outstanding work.

use keystone_core::Result;
use std::time::Duration;

/// Default maximum number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (100ms)
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default maximum delay for exponential backoff (10s)
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further attempt
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryConfig {
    /// Retry config for filesystem moves and timestamp updates
    pub fn for_filesystem() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
        }
    }

    /// A config that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        Backoff::new(self.base_delay, u32::MAX)
            .with_max_delay(self.max_delay)
            .nth(attempt as usize)
            .unwrap_or(self.max_delay)
    }
}

/// Doubling delays, bounded in count and optionally in size
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    remaining: u32,
    max_delay: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, attempts: u32) -> Self {
        Self {
            next: initial,
            remaining: attempts,
            max_delay: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = match self.max_delay {
            Some(max) => self.next.min(max),
            None => self.next,
        };
        self.next = self.next.saturating_mul(2);
        Some(current)
    }
}

/// Run `operation` until it succeeds or the retries run out
///
/// Sleeps the current thread between attempts, so call it from a blocking
/// context.
pub fn retry_blocking<F, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(error) if attempt < config.max_retries => {
                let delay = config.calculate_delay(attempt);
                tracing::debug!(attempt = attempt + 1, ?delay, %error, "retrying blocking operation");
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
