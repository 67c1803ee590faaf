//! Cache builder and driver selection

use crate::candidate::DriverCandidate;
use crate::driver::{Capabilities, DriverDescriptor, Operation};
use crate::plan::OperationPlan;
use keystone_codec::{Codec, Marshal};
use keystone_core::{CacheConfig, DrainConfig, Error, Result};
use keystone_utils::XdgPaths;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use super::internal::InFlight;
use super::types::{Cache, CacheInner, KeyMangler};

/// Builds a [`Cache`] from an ordered list of driver candidates
///
/// Settings that can live in a config file come from [`CacheConfig`]; the
/// key mangler, codec and custom drivers are set here.
pub struct CacheBuilder {
    candidates: Vec<DriverCandidate>,
    key_mangler: Option<KeyMangler>,
    codec: Arc<dyn Codec>,
    config: CacheConfig,
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration; its driver ids become the candidates
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            candidates: config
                .drivers
                .iter()
                .map(|id| DriverCandidate::from(id.as_str()))
                .collect(),
            key_mangler: None,
            codec: Arc::new(Marshal::default()),
            config: config.clone(),
        }
    }

    /// Replace the candidate list
    pub fn drivers<I, C>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<DriverCandidate>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Append a candidate
    pub fn driver(mut self, candidate: impl Into<DriverCandidate>) -> Self {
        self.candidates.push(candidate.into());
        self
    }

    /// Custom key mangler; replaces any configured prefix
    pub fn key_mangler<F>(mut self, mangler: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_mangler = Some(Arc::new(mangler));
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = Some(prefix.into());
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn filesystem_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.filesystem.root = Some(root.into());
        self
    }

    pub fn auto_clean_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.auto_clean_interval = interval;
        self
    }

    pub fn clean_on_init(mut self, clean: bool) -> Self {
        self.config.clean_on_init = clean;
        self
    }

    pub fn drain(mut self, drain: DrainConfig) -> Self {
        self.config.drain = drain;
        self
    }

    /// Probe the candidates in order and commit to the first loadable one
    pub async fn build(self) -> Result<Cache> {
        let filesystem_root = self
            .config
            .filesystem
            .root
            .clone()
            .unwrap_or_else(XdgPaths::default_cache_root);

        let mut descriptors = Vec::with_capacity(self.candidates.len());
        let mut selected = None;

        for candidate in &self.candidates {
            let Some(driver) = candidate.instantiate(&self.codec, &filesystem_root) else {
                tracing::warn!(driver = candidate.id(), "cannot load cache driver: unknown id");
                descriptors.push(DriverDescriptor {
                    id: candidate.id().to_string(),
                    capabilities: Capabilities::empty(),
                    is_loaded: false,
                });
                continue;
            };

            let is_loaded = driver.can_load().await;
            descriptors.push(DriverDescriptor {
                id: driver.id().to_string(),
                capabilities: driver.capabilities(),
                is_loaded,
            });

            if is_loaded {
                tracing::info!(driver = driver.id(), "loaded cache driver");
                selected = Some(driver);
                break;
            }
            tracing::warn!(driver = driver.id(), "cannot load cache driver");
        }

        let Some(driver) = selected else {
            let tried: Vec<String> = descriptors.iter().map(|d| d.id.clone()).collect();
            tracing::error!(tried = ?tried, "no cache driver could be loaded");
            return Err(Error::no_driver_available(tried));
        };

        let key_mangler = self
            .key_mangler
            .unwrap_or_else(|| prefix_mangler(self.config.key_prefix.clone()));

        let cache = Cache {
            inner: Arc::new(CacheInner {
                plan: OperationPlan::resolve(driver.capabilities()),
                driver,
                descriptors,
                key_mangler,
                drain: self.config.drain.clone(),
                in_flight: InFlight::default(),
                closed: AtomicBool::new(false),
                cleanup_handle: Mutex::new(None),
            }),
        };

        if self.config.clean_on_init {
            if cache.can(Operation::Clean) {
                cache.clean().await?;
            } else {
                tracing::debug!(
                    driver = cache.driver_id(),
                    "clean on init skipped: driver cannot clean"
                );
            }
        }

        cache.auto_clean(self.config.auto_clean_interval);

        Ok(cache)
    }
}

fn prefix_mangler(prefix: Option<String>) -> KeyMangler {
    match prefix {
        Some(prefix) => Arc::new(move |key: &str| format!("{prefix}{key}")),
        None => Arc::new(|key: &str| key.to_string()),
    }
}

impl Cache {
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// Build a cache straight from configuration
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        CacheBuilder::from_config(config).build().await
    }
}
