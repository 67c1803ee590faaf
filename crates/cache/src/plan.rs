//! How each optional operation is served by the active driver
//!
//! Resolved once when the cache commits to a driver; nothing is probed
//! again per call.

use crate::driver::{Capabilities, Operation};

/// Strategy for `has`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasStrategy {
    Native,
    /// `get` and check whether anything came back
    ViaGet,
}

/// Strategy for `clean` and `clear`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeStrategy {
    Native,
    /// Iterate `list` and `unset` what should go
    ListAndUnset,
    Unsupported,
}

/// Strategy for operations that cannot be synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Native,
    Unsupported,
}

/// Strategy for `destroy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyStrategy {
    Native,
    /// Nothing to release
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationPlan {
    pub has: HasStrategy,
    pub size: Support,
    pub list: Support,
    pub clean: PurgeStrategy,
    pub clear: PurgeStrategy,
    pub destroy: DestroyStrategy,
}

impl OperationPlan {
    pub fn resolve(capabilities: Capabilities) -> Self {
        let native = |flag| capabilities.contains(flag);
        let purge = |flag| {
            if native(flag) {
                PurgeStrategy::Native
            } else if native(Capabilities::LIST) {
                PurgeStrategy::ListAndUnset
            } else {
                PurgeStrategy::Unsupported
            }
        };
        let support = |flag| {
            if native(flag) {
                Support::Native
            } else {
                Support::Unsupported
            }
        };

        Self {
            has: if native(Capabilities::HAS) {
                HasStrategy::Native
            } else {
                HasStrategy::ViaGet
            },
            size: support(Capabilities::SIZE),
            list: support(Capabilities::LIST),
            clean: purge(Capabilities::CLEAN),
            clear: purge(Capabilities::CLEAR),
            destroy: if native(Capabilities::DESTROY) {
                DestroyStrategy::Native
            } else {
                DestroyStrategy::Noop
            },
        }
    }

    /// Whether the operation is available, natively or synthesized
    pub fn can(&self, operation: Operation) -> bool {
        match operation {
            Operation::Set
            | Operation::Get
            | Operation::Unset
            | Operation::Has
            | Operation::Destroy => true,
            Operation::Size => self.size == Support::Native,
            Operation::List => self.list == Support::Native,
            Operation::Clean => self.clean != PurgeStrategy::Unsupported,
            Operation::Clear => self.clear != PurgeStrategy::Unsupported,
        }
    }
}
