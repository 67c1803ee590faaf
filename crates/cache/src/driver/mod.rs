//! Storage driver contract
//!
//! A driver owns the entries it stores and must provide `set`, `get` and
//! `unset`. Everything else is optional and advertised through
//! [`Capabilities`]; the default bodies refuse with
//! [`Error::CapabilityUnsupported`].

mod filesystem;
mod memory;

pub use filesystem::FilesystemDriver;
pub use memory::MemoryDriver;

use async_trait::async_trait;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use keystone_codec::Document;
use keystone_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Optional operations a driver implements natively
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        const HAS = 1 << 0;
        const SIZE = 1 << 1;
        const LIST = 1 << 2;
        const CLEAN = 1 << 3;
        const CLEAR = 1 << 4;
        const DESTROY = 1 << 5;
    }
}

/// Every operation of the cache contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Set,
    Get,
    Unset,
    Has,
    Size,
    List,
    Clean,
    Clear,
    Destroy,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Set => "set",
            Operation::Get => "get",
            Operation::Unset => "unset",
            Operation::Has => "has",
            Operation::Size => "size",
            Operation::List => "list",
            Operation::Clean => "clean",
            Operation::Clear => "clear",
            Operation::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored entry as reported by `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    /// Key as the driver sees it (already mangled)
    pub id: String,
    pub created: Option<DateTime<Utc>>,
    /// `None` means the entry never expires
    pub expiry: Option<DateTime<Utc>>,
}

/// Probe result for one driver candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDescriptor {
    pub id: String,
    pub capabilities: Capabilities,
    pub is_loaded: bool,
}

/// Whether an entry stamped with `expires_at` is gone at `now`
pub(crate) fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at <= now)
}

/// A backing medium for the cache
#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    /// Identifier used in candidate lists and logs
    fn id(&self) -> &str;

    /// Optional operations this driver implements itself
    fn capabilities(&self) -> Capabilities;

    /// Check that the medium is reachable; never fails
    async fn can_load(&self) -> bool;

    async fn set(&self, key: &str, value: &Document, expires_at: Option<DateTime<Utc>>)
        -> Result<()>;

    /// Fetch a live entry; expired entries are purged and reported as missing
    async fn get(&self, key: &str) -> Result<Option<Document>>;

    async fn unset(&self, key: &str) -> Result<()>;

    async fn has(&self, _key: &str) -> Result<bool> {
        Err(unsupported(self.id(), Operation::Has))
    }

    /// Stored size in bytes of a live entry
    async fn size(&self, _key: &str) -> Result<Option<u64>> {
        Err(unsupported(self.id(), Operation::Size))
    }

    /// Live entries
    async fn list(&self) -> Result<Vec<EntrySummary>> {
        Err(unsupported(self.id(), Operation::List))
    }

    /// Purge expired entries
    async fn clean(&self) -> Result<()> {
        Err(unsupported(self.id(), Operation::Clean))
    }

    /// Purge every entry
    async fn clear(&self) -> Result<()> {
        Err(unsupported(self.id(), Operation::Clear))
    }

    /// Release held resources
    async fn destroy(&self) -> Result<()> {
        Err(unsupported(self.id(), Operation::Destroy))
    }
}

pub(crate) fn unsupported(driver: &str, operation: Operation) -> Error {
    Error::capability_unsupported(operation.as_str(), driver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_expiry_boundaries() {
        let now = Utc::now();
        assert!(!is_expired(None, now));
        assert!(is_expired(Some(now), now));
        assert!(is_expired(Some(now - TimeDelta::seconds(1)), now));
        assert!(!is_expired(Some(now + TimeDelta::seconds(1)), now));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Clean.to_string(), "clean");
        assert_eq!(
            unsupported("memory", Operation::Size).to_string(),
            Error::capability_unsupported("size", "memory").to_string()
        );
    }
}
