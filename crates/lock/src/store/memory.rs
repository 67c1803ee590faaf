//! Process-local lock store

use super::LockStore;
use crate::record::{LockRecord, RecordPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use keystone_core::{Error, Result};

/// Records held in a concurrent map
///
/// The map's entry API gives the atomic insert-if-absent. Exclusion only
/// holds between callers sharing this instance.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    records: DashMap<String, LockRecord>,
}

impl MemoryLockStore {
    pub const BACKEND: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    fn backend(&self) -> &str {
        Self::BACKEND
    }

    async fn insert(&self, record: LockRecord) -> Result<()> {
        match self.records.entry(record.key_hash.clone()) {
            Entry::Occupied(_) => Err(Error::duplicate_key(record.key_hash)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find(&self, key_hash: &str) -> Result<Option<LockRecord>> {
        Ok(self.records.get(key_hash).map(|record| record.clone()))
    }

    async fn update(&self, key_hash: &str, patch: RecordPatch) -> Result<bool> {
        Ok(match self.records.get_mut(key_hash) {
            Some(mut record) => {
                record.apply(patch);
                true
            }
            None => false,
        })
    }

    async fn delete(&self, key_hash: &str) -> Result<bool> {
        Ok(self.records.remove(key_hash).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_abandoned(now));
        Ok(before.saturating_sub(self.records.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let count = self.records.len() as u64;
        self.records.clear();
        Ok(count)
    }

    async fn list(&self) -> Result<Vec<LockRecord>> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.key_hash.cmp(&b.key_hash)));
        Ok(records)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::conformance;
    use super::*;

    #[tokio::test]
    async fn test_insert_is_unique() -> Result<()> {
        conformance::insert_is_unique(&MemoryLockStore::new()).await
    }

    #[tokio::test]
    async fn test_round_trip_and_update() -> Result<()> {
        conformance::round_trip_and_update(&MemoryLockStore::new()).await
    }

    #[tokio::test]
    async fn test_deletes() -> Result<()> {
        conformance::deletes(&MemoryLockStore::new()).await
    }
}
