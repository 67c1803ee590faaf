//! The cache manager
//!
//! - Commits to the first loadable driver at build time
//! - Routes every key through the key mangler before it reaches the driver
//! - Serves optional operations per the resolved [`OperationPlan`](crate::OperationPlan)
//! - Tracks in-flight writes so `destroy` can drain them
//! - Runs an optional auto-clean task that reschedules after each pass

pub mod internal;

// Private modules
mod builder;
mod cleanup;
mod operations;
mod shutdown;
mod types;

pub use builder::CacheBuilder;
pub use types::{Cache, KeyMangler};

#[cfg(test)]
mod tests;
