//! Lock record stores
//!
//! A store must turn a second insert of the same `key_hash` into
//! [`Error::DuplicateKey`](keystone_core::Error::DuplicateKey) atomically.
//! The lock's exclusion guarantee is exactly as strong as that check.

mod memory;
mod sqlite;

pub use memory::MemoryLockStore;
pub use sqlite::SqliteLockStore;

use crate::record::{LockRecord, RecordPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keystone_core::Result;
use std::fmt;

#[async_trait]
pub trait LockStore: Send + Sync + fmt::Debug {
    /// Backend name used in logs and errors
    fn backend(&self) -> &str;

    /// Insert a record, failing with `DuplicateKey` if its hash is taken
    async fn insert(&self, record: LockRecord) -> Result<()>;

    async fn find(&self, key_hash: &str) -> Result<Option<LockRecord>>;

    /// Apply a patch; returns whether a record matched
    async fn update(&self, key_hash: &str, patch: RecordPatch) -> Result<bool>;

    /// Delete one record; returns whether it existed
    async fn delete(&self, key_hash: &str) -> Result<bool>;

    /// Delete records past either horizon; returns how many went
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn delete_all(&self) -> Result<u64>;

    async fn list(&self) -> Result<Vec<LockRecord>>;

    /// Release the store's resources
    async fn close(&self) -> Result<()>;
}
