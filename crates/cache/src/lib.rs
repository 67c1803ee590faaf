//! Cache manager for keystone
//!
//! A [`Cache`] tries an ordered list of storage drivers and commits to the
//! first one that can reach its medium. Every operation then goes through
//! that driver, with operations the driver lacks synthesized from the ones
//! it has (or refused with `CapabilityUnsupported`).
//!
//! - Drivers implement [`Driver`]; [`MemoryDriver`] and [`FilesystemDriver`]
//!   ship with the crate.
//! - [`OperationPlan`] records, once at start-up, how each optional
//!   operation is served.
//! - Writes are tracked so that [`Cache::destroy`] can wait for them.

pub mod candidate;
pub mod core;
pub mod driver;
pub mod plan;

pub use candidate::DriverCandidate;
pub use self::core::{Cache, CacheBuilder, KeyMangler};
pub use driver::{
    Capabilities, Driver, DriverDescriptor, EntrySummary, FilesystemDriver, MemoryDriver,
    Operation,
};
pub use keystone_codec::{Codec, Document, Marshal};
pub use keystone_core::{Error, Expiry, Result};
pub use plan::OperationPlan;
