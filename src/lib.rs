//! Cross-process coordination primitives
//!
//! - [`cache`]: a key/value cache over pluggable storage drivers, with
//!   expiry, auto-clean and drained shutdown
//! - [`lock`]: a distributed lock keyed by arbitrary values, backed by an
//!   in-memory map or a shared SQLite file
//! - [`throttle`]: single-flight execution on top of the lock, with queueing
//!   and a cooldown after each run
//!
//! Configuration is layered (defaults, JSON file, `KEYSTONE_*` environment)
//! and loaded through [`ConfigLoader`].

pub use keystone_cache as cache;
pub use keystone_codec as codec;
pub use keystone_core as core;
pub use keystone_lock as lock;
pub use keystone_throttle as throttle;
pub use keystone_utils as utils;

// Re-export commonly used items
pub use keystone_cache::{Cache, CacheBuilder, Driver, DriverCandidate};
pub use keystone_codec::{Codec, Document, Marshal};
pub use keystone_core::{ConfigLoader, CoordinationConfig, Error, Expiry, Result};
pub use keystone_lock::{Lock, LockBuilder, LockKey};
pub use keystone_throttle::{QueuePolicy, Throttle, ThrottleBuilder, ThrottleOptions};
