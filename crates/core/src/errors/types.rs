//! Core error type definitions

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Result type alias for keystone operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for keystone operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No candidate storage driver could reach its medium at start-up
    NoDriverAvailable { tried: Vec<String> },

    /// Neither the active driver nor a synthesized fallback supports the operation
    CapabilityUnsupported { operation: String, driver: String },

    /// An expiry resolved to a point that has already passed, or could not be parsed
    InvalidExpiry { input: String, reason: String },

    /// `destroy` could not confirm in-flight writes finished within its retry budget
    DrainTimeout { pending: usize, attempts: u32 },

    /// A throttle waiter was rejected because the bounded queue was exceeded
    QueueFull { hash: String },

    /// File system operations
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Value encoding or decoding failures
    Serialization { context: String, message: String },

    /// A value graph contains a cycle where cycles are not permitted
    Cycle { path: String },

    /// The backing store rejected an insert because the unique key already exists
    DuplicateKey { key_hash: String },

    /// Backing store failures other than uniqueness violations
    Store {
        backend: String,
        operation: String,
        message: String,
    },

    /// Configuration errors
    Configuration { message: String },

    /// Operation attempted on a component that has been destroyed
    Shutdown { component: String },

    /// A throttled worker failed
    Worker {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A coalesced caller shares the failure of the flight it joined
    Coalesced {
        hash: String,
        #[source]
        source: Arc<Error>,
    },
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Retry the operation
    Retry { after: Duration },

    /// Check file permissions
    CheckPermissions { path: PathBuf },

    /// Configure a driver candidate that can reach its medium
    ConfigureDriver,

    /// Update the configuration
    UpdateConfiguration,

    /// Use a fallback value or code path
    UseFallback,

    /// No automated recovery possible
    Manual { instructions: String },

    /// No recovery possible
    NoRecovery,
}
