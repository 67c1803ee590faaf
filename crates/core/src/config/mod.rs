//! Layered configuration for the cache, lock and throttle
//!
//! Only plain data lives here. Settings that cannot be expressed in a file
//! (key-mangling closures, codec overrides, custom drivers) are supplied
//! through the builders of the individual crates, which accept these
//! structs as their starting point.

mod loader;

pub use loader::ConfigLoader;

use crate::constants::{
    DEFAULT_DRAIN_INITIAL_WAIT_MS, DEFAULT_DRAIN_MAX_ATTEMPTS, DEFAULT_LOCK_EXPIRY_SECS,
    DEFAULT_LOCK_TABLE, DEFAULT_LOCK_TTL_SECS, DEFAULT_THROTTLE_QUEUE_DEPTH,
    DEFAULT_THROTTLE_RETRY_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration consumed by the coordination layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    pub cache: CacheConfig,
    pub lock: LockConfig,
    pub throttle: ThrottleConfig,
    /// Where the configuration was loaded from
    #[serde(skip)]
    pub source: ConfigSource,
}

/// Cache manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Driver ids tried in order until one reports itself loadable
    pub drivers: Vec<String>,
    /// Namespace prepended to every key before it reaches a driver
    pub key_prefix: Option<String>,
    /// Run `clean()` once the driver has been selected
    pub clean_on_init: bool,
    /// Recurring clean interval; disabled when absent
    #[serde(with = "duration_str::option")]
    pub auto_clean_interval: Option<Duration>,
    pub filesystem: FilesystemConfig,
    pub drain: DrainConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            drivers: vec!["memory".to_string()],
            key_prefix: None,
            clean_on_init: false,
            auto_clean_interval: None,
            filesystem: FilesystemConfig::default(),
            drain: DrainConfig::default(),
        }
    }
}

/// Filesystem driver configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    /// Directory holding one file per key; defaults to a directory under the system temp dir
    pub root: Option<PathBuf>,
}

/// Backoff used by `destroy()` while waiting for in-flight writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    #[serde(with = "duration_str")]
    pub initial_wait: Duration,
    pub max_attempts: u32,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_millis(DEFAULT_DRAIN_INITIAL_WAIT_MS),
            max_attempts: DEFAULT_DRAIN_MAX_ATTEMPTS,
        }
    }
}

/// Which store backs the distributed lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockBackend {
    /// Process-local table; only useful for a single process and for tests
    #[default]
    Memory,
    /// SQLite database file shared by every process pointed at it
    Sqlite,
}

/// Distributed lock configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Hard expiry: total lifetime of a lock regardless of heartbeats
    #[serde(with = "duration_str")]
    pub expiry: Duration,
    /// Heartbeat horizon a holder must refresh through `alive()`
    #[serde(with = "duration_str")]
    pub ttl: Duration,
    pub backend: LockBackend,
    pub sqlite: SqliteConfig,
    /// Mirror the fields of structured keys into the record payload
    pub include_keys: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(DEFAULT_LOCK_EXPIRY_SECS),
            ttl: Duration::from_secs(DEFAULT_LOCK_TTL_SECS),
            backend: LockBackend::default(),
            sqlite: SqliteConfig::default(),
            include_keys: true,
        }
    }
}

/// SQLite lock store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file; defaults to a file under the user data directory
    pub path: Option<PathBuf>,
    /// Table holding the lock records
    pub table: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            table: DEFAULT_LOCK_TABLE.to_string(),
        }
    }
}

/// How a throttle treats callers that find the lock already held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicyKind {
    /// Reject immediately
    #[default]
    DropImmediate,
    /// Queue up to `queue_depth` waiters per hash
    BoundedQueue,
}

/// Throttle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Cooldown after the worker completes before the lock is released
    #[serde(with = "duration_str")]
    pub wait: Duration,
    pub policy: QueuePolicyKind,
    pub queue_depth: usize,
    /// Let same-process callers join a running flight instead of contending for the lock
    pub share_in_flight: bool,
    /// How often queued waiters retry a lock held by another process
    #[serde(with = "duration_str")]
    pub retry_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            wait: Duration::ZERO,
            policy: QueuePolicyKind::default(),
            queue_depth: DEFAULT_THROTTLE_QUEUE_DEPTH,
            share_in_flight: true,
            retry_interval: Duration::from_millis(DEFAULT_THROTTLE_RETRY_INTERVAL_MS),
        }
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    #[default]
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
}

/// Serde helpers writing durations as humantime strings (`"1h"`, `"250ms"`)
pub mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        crate::expiry::parse_relative(&text).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let text = Option::<String>::deserialize(deserializer)?;
            match text {
                Some(text) => crate::expiry::parse_relative(&text)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
