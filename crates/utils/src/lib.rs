//! Shared utilities for keystone
//!
//! Small building blocks used by the cache, lock and throttle crates:
//! subscriber initialisation, exponential backoff, swap-file writes that
//! stamp a modification time before the final rename, and default paths.

pub mod backoff;
pub mod swap_file;
pub mod tracing;
pub mod xdg;

pub use backoff::{retry_blocking, Backoff, RetryConfig};
pub use swap_file::{is_swap_file, write_stamped, SWAP_SUFFIX};
pub use xdg::XdgPaths;
