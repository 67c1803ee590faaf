//! Shared errors, configuration and expiry handling for `keystone`.
//!
//! Every other keystone crate builds on this one:
//!
//! - **`errors`**: the `Error` enum and `Result` alias used across the cache,
//!   lock and throttle, with recovery hints.
//! - **`config`**: layered [`CoordinationConfig`] loading (defaults, JSON file,
//!   environment).
//! - **`expiry`**: resolution of absolute, offset and relative expiries into
//!   UTC timestamps.
//! - **`constants`**: environment variable names and defaults.

pub mod config;
pub mod constants;
pub mod errors;
pub mod expiry;

pub use self::{
    config::{
        CacheConfig, ConfigLoader, ConfigSource, CoordinationConfig, DrainConfig,
        FilesystemConfig, LockBackend, LockConfig, QueuePolicyKind, SqliteConfig, ThrottleConfig,
    },
    errors::{Error, IoResultExt, RecoveryHint, Result, SerializationResultExt},
    expiry::Expiry,
};
