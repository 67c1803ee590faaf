//! Lock construction from configuration

use crate::lock::Lock;
use crate::store::{LockStore, MemoryLockStore, SqliteLockStore};
use keystone_core::{LockBackend, LockConfig, Result};
use keystone_utils::XdgPaths;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Builds a [`Lock`] over a configured or supplied store
#[derive(Debug, Default)]
pub struct LockBuilder {
    config: LockConfig,
    store: Option<Arc<dyn LockStore>>,
}

impl LockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LockConfig) -> Self {
        Self {
            config: config.clone(),
            store: None,
        }
    }

    /// Use this store instead of opening the configured backend
    pub fn store(mut self, store: Arc<dyn LockStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.config.expiry = expiry;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    pub fn include_keys(mut self, include: bool) -> Self {
        self.config.include_keys = include;
        self
    }

    pub fn backend(mut self, backend: LockBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.sqlite.path = Some(path.into());
        self
    }

    /// Open the configured store, unless one was supplied
    pub async fn build(self) -> Result<Lock> {
        let store: Arc<dyn LockStore> = match self.store {
            Some(store) => store,
            None => match self.config.backend {
                LockBackend::Memory => Arc::new(MemoryLockStore::new()),
                LockBackend::Sqlite => {
                    let path = self
                        .config
                        .sqlite
                        .path
                        .clone()
                        .unwrap_or_else(XdgPaths::default_lock_db);
                    Arc::new(SqliteLockStore::open(path, &self.config.sqlite.table).await?)
                }
            },
        };
        tracing::debug!(backend = store.backend(), "lock store ready");

        Ok(Self::assemble(store, &self.config))
    }

    /// Build synchronously; a supplied store is used, otherwise a memory store
    pub fn build_with_store(self) -> Lock {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryLockStore::new()));
        Self::assemble(store, &self.config)
    }

    fn assemble(store: Arc<dyn LockStore>, config: &LockConfig) -> Lock {
        Lock {
            store,
            expiry: config.expiry,
            ttl: config.ttl,
            include_keys: config.include_keys,
            closed: AtomicBool::new(false),
        }
    }
}

impl Lock {
    pub fn builder() -> LockBuilder {
        LockBuilder::new()
    }

    /// Open the store named by the configuration
    pub async fn from_config(config: &LockConfig) -> Result<Self> {
        LockBuilder::from_config(config).build().await
    }
}
