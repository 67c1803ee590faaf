//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;
use std::sync::Arc;

// Helper methods for creating errors with context
impl Error {
    /// Create an error for a failed driver selection
    #[must_use]
    pub fn no_driver_available(tried: Vec<String>) -> Self {
        Error::NoDriverAvailable { tried }
    }

    /// Create an error for an operation neither native nor synthesizable
    #[must_use]
    pub fn capability_unsupported(operation: impl Into<String>, driver: impl Into<String>) -> Self {
        Error::CapabilityUnsupported {
            operation: operation.into(),
            driver: driver.into(),
        }
    }

    /// Create an invalid expiry error
    #[must_use]
    pub fn invalid_expiry(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidExpiry {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a queue overflow error for a throttle hash
    #[must_use]
    pub fn queue_full(hash: impl Into<String>) -> Self {
        Error::QueueFull { hash: hash.into() }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Serialization {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a cycle error pointing at the offending path
    #[must_use]
    pub fn cycle(path: impl Into<String>) -> Self {
        Error::Cycle { path: path.into() }
    }

    /// Create a uniqueness violation error
    #[must_use]
    pub fn duplicate_key(key_hash: impl Into<String>) -> Self {
        Error::DuplicateKey {
            key_hash: key_hash.into(),
        }
    }

    /// Create a backing store error
    #[must_use]
    pub fn store(
        backend: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Store {
            backend: backend.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create an error for use after destroy
    #[must_use]
    pub fn shutdown(component: impl Into<String>) -> Self {
        Error::Shutdown {
            component: component.into(),
        }
    }

    /// Create a worker failure without an underlying error
    #[must_use]
    pub fn worker(message: impl Into<String>) -> Self {
        Error::Worker {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap any error raised by a throttled worker
    #[must_use]
    pub fn worker_with_source(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let source = source.into();
        Error::Worker {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Share a leader's failure with a coalesced follower
    #[must_use]
    pub fn coalesced(hash: impl Into<String>, source: Arc<Error>) -> Self {
        Error::Coalesced {
            hash: hash.into(),
            source,
        }
    }
}
