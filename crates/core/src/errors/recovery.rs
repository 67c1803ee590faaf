//! Recovery utilities for keystone errors

use super::types::{Error, RecoveryHint};
use std::time::Duration;

impl Error {
    /// Get the recovery hint for this error
    #[must_use]
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::NoDriverAvailable { .. } => RecoveryHint::ConfigureDriver,
            Self::CapabilityUnsupported { .. } => RecoveryHint::ConfigureDriver,
            Self::InvalidExpiry { .. } => RecoveryHint::UseFallback,
            Self::DrainTimeout { .. } => RecoveryHint::Manual {
                instructions: "in-flight writes never settled; inspect the driver for a hung write"
                    .to_string(),
            },
            Self::QueueFull { .. } => RecoveryHint::Retry {
                after: Duration::from_millis(100),
            },
            Self::Io { path, source, .. } => match source.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    RecoveryHint::CheckPermissions { path: path.clone() }
                }
                _ => RecoveryHint::Retry {
                    after: Duration::from_millis(50),
                },
            },
            Self::Serialization { .. } | Self::Cycle { .. } => RecoveryHint::NoRecovery,
            Self::DuplicateKey { .. } => RecoveryHint::Retry {
                after: Duration::from_millis(100),
            },
            Self::Store { .. } => RecoveryHint::Retry {
                after: Duration::from_millis(250),
            },
            Self::Configuration { .. } => RecoveryHint::UpdateConfiguration,
            Self::Shutdown { .. } => RecoveryHint::NoRecovery,
            Self::Worker { .. } => RecoveryHint::NoRecovery,
            Self::Coalesced { source, .. } => source.recovery_hint(),
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Retry { .. })
    }

    /// Check if this error means a throttle caller was turned away
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::Shutdown { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_queue_full_is_transient() {
        let error = Error::queue_full("abc");
        assert!(error.is_transient());
        assert!(error.is_rejection());
    }

    #[test]
    fn test_coalesced_inherits_hint() {
        let inner = Arc::new(Error::configuration("bad"));
        let error = Error::coalesced("abc", inner);
        assert_eq!(error.recovery_hint(), RecoveryHint::UpdateConfiguration);
    }

    #[test]
    fn test_permission_denied_hint() {
        let error = Error::file_system(
            "/root/cache",
            "write swap file",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(
            error.recovery_hint(),
            RecoveryHint::CheckPermissions { .. }
        ));
        assert!(!error.is_transient());
    }
}
