//! Error types and result extensions for keystone operations

mod builders;
mod conversions;
mod display;
mod extensions;
mod recovery;
mod types;

pub use extensions::*;
pub use types::{Error, RecoveryHint, Result};
