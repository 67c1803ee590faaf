//! Driver candidates named in a cache's preference list

use crate::driver::{Driver, FilesystemDriver, MemoryDriver};
use keystone_codec::Codec;
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// One entry of the ordered driver preference list
#[derive(Clone)]
pub enum DriverCandidate {
    Memory,
    Filesystem,
    /// A driver constructed by the caller
    Custom(Arc<dyn Driver>),
    /// An id no driver answers to; never loadable
    Unknown(String),
}

impl DriverCandidate {
    pub fn id(&self) -> &str {
        match self {
            DriverCandidate::Memory => MemoryDriver::ID,
            DriverCandidate::Filesystem => FilesystemDriver::ID,
            DriverCandidate::Custom(driver) => driver.id(),
            DriverCandidate::Unknown(id) => id,
        }
    }

    /// Build the driver this candidate names
    pub(crate) fn instantiate(
        &self,
        codec: &Arc<dyn Codec>,
        filesystem_root: &Path,
    ) -> Option<Arc<dyn Driver>> {
        let driver: Arc<dyn Driver> = match self {
            DriverCandidate::Memory => Arc::new(MemoryDriver::new(Arc::clone(codec))),
            DriverCandidate::Filesystem => Arc::new(FilesystemDriver::new(
                filesystem_root.to_path_buf(),
                Arc::clone(codec),
            )),
            DriverCandidate::Custom(driver) => Arc::clone(driver),
            DriverCandidate::Unknown(_) => return None,
        };
        Some(driver)
    }
}

impl fmt::Debug for DriverCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverCandidate::Custom(driver) => write!(f, "Custom({})", driver.id()),
            other => write!(f, "{}", other.id()),
        }
    }
}

impl FromStr for DriverCandidate {
    type Err = Infallible;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Ok(match id.trim().to_lowercase().as_str() {
            "memory" => DriverCandidate::Memory,
            "filesystem" | "fs" => DriverCandidate::Filesystem,
            other => DriverCandidate::Unknown(other.to_string()),
        })
    }
}

impl From<&str> for DriverCandidate {
    fn from(id: &str) -> Self {
        match id.parse() {
            Ok(candidate) => candidate,
            Err(never) => match never {},
        }
    }
}

impl From<Arc<dyn Driver>> for DriverCandidate {
    fn from(driver: Arc<dyn Driver>) -> Self {
        DriverCandidate::Custom(driver)
    }
}
