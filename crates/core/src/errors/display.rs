//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoDriverAvailable { tried } => {
                if tried.is_empty() {
                    write!(f, "no cache driver available: the candidate list is empty")
                } else {
                    write!(
                        f,
                        "no cache driver available to load from list: {}",
                        tried.join(", ")
                    )
                }
            }
            Error::CapabilityUnsupported { operation, driver } => {
                write!(
                    f,
                    "operation '{operation}' is not supported by the '{driver}' driver"
                )
            }
            Error::InvalidExpiry { input, reason } => {
                write!(f, "invalid expiry '{input}': {reason}")
            }
            Error::DrainTimeout { pending, attempts } => {
                write!(
                    f,
                    "gave up waiting for {pending} in-flight write(s) after {attempts} attempts"
                )
            }
            Error::QueueFull { hash } => write!(f, "throttle queue is full for '{hash}'"),
            Error::Io {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system error during {} on '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Serialization { context, message } => {
                write!(f, "serialization error ({context}): {message}")
            }
            Error::Cycle { path } => {
                write!(f, "value contains a circular reference at '{path}'")
            }
            Error::DuplicateKey { key_hash } => {
                write!(f, "a record with key '{key_hash}' already exists")
            }
            Error::Store {
                backend,
                operation,
                message,
            } => write!(f, "{backend} store error during {operation}: {message}"),
            Error::Configuration { message } => write!(f, "configuration error: {message}"),
            Error::Shutdown { component } => {
                write!(f, "{component} has been destroyed")
            }
            Error::Worker { message, .. } => write!(f, "worker failed: {message}"),
            Error::Coalesced { hash, source } => {
                write!(f, "shared flight for '{hash}' failed: {source}")
            }
        }
    }
}
