//! Distributed lock for keystone
//!
//! A [`Lock`] writes one [`LockRecord`] per held key into a shared
//! [`LockStore`]. Acquisition is an insert; the store's uniqueness
//! constraint on the key hash is what makes two concurrent acquisitions of
//! the same key end with exactly one winner, across processes. No
//! client-side mutex stands in for it.
//!
//! Each record carries two horizons: `expires_at` bounds the total lifetime
//! of the lock and `ttl_at` must be pushed forward by the holder through
//! [`Lock::alive`]. A record past either horizon counts as absent.

mod builder;
mod key;
mod lock;
mod record;
pub mod store;

pub use builder::LockBuilder;
pub use key::LockKey;
pub use lock::Lock;
pub use record::{Fields, LockRecord, RecordPatch};
pub use store::{LockStore, MemoryLockStore, SqliteLockStore};

pub use keystone_core::{Error, Result};
