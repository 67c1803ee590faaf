//! Configuration loading with precedence: defaults, then file, then environment

use super::{ConfigSource, CoordinationConfig, LockBackend};
use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, KEYSTONE_CACHE_AUTO_CLEAN_VAR, KEYSTONE_CACHE_DIR_VAR,
    KEYSTONE_CACHE_DRIVERS_VAR, KEYSTONE_CACHE_PREFIX_VAR, KEYSTONE_CONFIG_VAR,
    KEYSTONE_LOCK_BACKEND_VAR, KEYSTONE_LOCK_DB_VAR, KEYSTONE_LOCK_EXPIRY_VAR,
    KEYSTONE_LOCK_TTL_VAR, KEYSTONE_THROTTLE_WAIT_VAR,
};
use crate::errors::{Error, IoResultExt, Result};
use crate::expiry::parse_relative;
use std::path::{Path, PathBuf};

/// Loads [`CoordinationConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full precedence handling
    pub fn load() -> Result<CoordinationConfig> {
        let mut config = CoordinationConfig::default();

        if let Some(path) = Self::config_file_path() {
            if path.exists() {
                config = Self::load_from_path(&path)?;
            }
        }

        Self::apply_env(config, |name| std::env::var(name).ok())
    }

    /// Load a JSON configuration file; missing fields keep their defaults
    pub fn load_from_path(path: &Path) -> Result<CoordinationConfig> {
        let content = std::fs::read_to_string(path).at_path(path, "read config file")?;

        let mut config: CoordinationConfig = serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid config file '{}': {e}", path.display()))
        })?;
        config.source = ConfigSource::ConfigFile(path.to_path_buf());

        tracing::debug!(path = %path.display(), "loaded coordination config file");
        Ok(config)
    }

    /// Overlay environment variables read through `lookup`
    pub fn apply_env<F>(mut config: CoordinationConfig, lookup: F) -> Result<CoordinationConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(drivers) = lookup(KEYSTONE_CACHE_DRIVERS_VAR) {
            config.cache.drivers = drivers
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            applied.push(KEYSTONE_CACHE_DRIVERS_VAR);
        }

        if let Some(prefix) = lookup(KEYSTONE_CACHE_PREFIX_VAR) {
            config.cache.key_prefix = Some(prefix).filter(|p| !p.is_empty());
            applied.push(KEYSTONE_CACHE_PREFIX_VAR);
        }

        if let Some(dir) = lookup(KEYSTONE_CACHE_DIR_VAR) {
            config.cache.filesystem.root = Some(PathBuf::from(dir));
            applied.push(KEYSTONE_CACHE_DIR_VAR);
        }

        if let Some(interval) = lookup(KEYSTONE_CACHE_AUTO_CLEAN_VAR) {
            config.cache.auto_clean_interval = match interval.trim() {
                "" | "off" | "false" => None,
                text => Some(Self::duration_var(KEYSTONE_CACHE_AUTO_CLEAN_VAR, text)?),
            };
            applied.push(KEYSTONE_CACHE_AUTO_CLEAN_VAR);
        }

        if let Some(backend) = lookup(KEYSTONE_LOCK_BACKEND_VAR) {
            config.lock.backend = match backend.trim().to_lowercase().as_str() {
                "memory" => LockBackend::Memory,
                "sqlite" => LockBackend::Sqlite,
                other => {
                    return Err(Error::configuration(format!(
                        "{KEYSTONE_LOCK_BACKEND_VAR}: unknown lock backend '{other}'"
                    )))
                }
            };
            applied.push(KEYSTONE_LOCK_BACKEND_VAR);
        }

        if let Some(path) = lookup(KEYSTONE_LOCK_DB_VAR) {
            config.lock.sqlite.path = Some(PathBuf::from(path));
            applied.push(KEYSTONE_LOCK_DB_VAR);
        }

        if let Some(expiry) = lookup(KEYSTONE_LOCK_EXPIRY_VAR) {
            config.lock.expiry = Self::duration_var(KEYSTONE_LOCK_EXPIRY_VAR, &expiry)?;
            applied.push(KEYSTONE_LOCK_EXPIRY_VAR);
        }

        if let Some(ttl) = lookup(KEYSTONE_LOCK_TTL_VAR) {
            config.lock.ttl = Self::duration_var(KEYSTONE_LOCK_TTL_VAR, &ttl)?;
            applied.push(KEYSTONE_LOCK_TTL_VAR);
        }

        if let Some(wait) = lookup(KEYSTONE_THROTTLE_WAIT_VAR) {
            config.throttle.wait = Self::duration_var(KEYSTONE_THROTTLE_WAIT_VAR, &wait)?;
            applied.push(KEYSTONE_THROTTLE_WAIT_VAR);
        }

        if !applied.is_empty() {
            tracing::debug!(variables = ?applied, "applied environment overrides");
            config.source = ConfigSource::EnvironmentVariable(applied.join(","));
        }

        Ok(config)
    }

    /// Get the configuration file path
    ///
    /// `KEYSTONE_CONFIG` wins; otherwise `<config dir>/keystone/config.json`.
    pub fn config_file_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(KEYSTONE_CONFIG_VAR) {
            return Some(PathBuf::from(explicit));
        }
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    fn duration_var(name: &str, text: &str) -> Result<std::time::Duration> {
        parse_relative(text).map_err(|e| Error::configuration(format!("{name}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueuePolicyKind;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CoordinationConfig::default();
        assert_eq!(config.cache.drivers, vec!["memory".to_string()]);
        assert_eq!(config.lock.expiry, Duration::from_secs(3600));
        assert_eq!(config.lock.ttl, Duration::from_secs(60));
        assert_eq!(config.throttle.policy, QueuePolicyKind::DropImmediate);
        assert!(config.throttle.share_in_flight);
        assert_eq!(config.source, ConfigSource::Default);
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cache": {"drivers": ["filesystem", "memory"], "auto_clean_interval": "10m"},
                "lock": {"ttl": "30s"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path)?;
        assert_eq!(config.cache.drivers, vec!["filesystem", "memory"]);
        assert_eq!(
            config.cache.auto_clean_interval,
            Some(Duration::from_secs(600))
        );
        assert_eq!(config.lock.ttl, Duration::from_secs(30));
        assert_eq!(config.lock.expiry, Duration::from_secs(3600));
        assert_eq!(config.source, ConfigSource::ConfigFile(path));
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"lock": {"ttl": "eventually"}}"#).unwrap();

        assert!(matches!(
            ConfigLoader::load_from_path(&path),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let lookup = lookup_from(&[
            (KEYSTONE_CACHE_DRIVERS_VAR, "filesystem, memory"),
            (KEYSTONE_CACHE_PREFIX_VAR, "tenant-a:"),
            (KEYSTONE_LOCK_BACKEND_VAR, "SQLite"),
            (KEYSTONE_LOCK_TTL_VAR, "5s"),
            (KEYSTONE_CACHE_AUTO_CLEAN_VAR, "off"),
        ]);

        let config = ConfigLoader::apply_env(CoordinationConfig::default(), lookup)?;
        assert_eq!(config.cache.drivers, vec!["filesystem", "memory"]);
        assert_eq!(config.cache.key_prefix.as_deref(), Some("tenant-a:"));
        assert_eq!(config.lock.backend, LockBackend::Sqlite);
        assert_eq!(config.lock.ttl, Duration::from_secs(5));
        assert_eq!(config.cache.auto_clean_interval, None);
        assert!(matches!(config.source, ConfigSource::EnvironmentVariable(_)));
        Ok(())
    }

    #[test]
    fn test_env_rejects_unknown_backend() {
        let lookup = lookup_from(&[(KEYSTONE_LOCK_BACKEND_VAR, "mongo")]);
        assert!(ConfigLoader::apply_env(CoordinationConfig::default(), lookup).is_err());
    }

    #[test]
    #[serial]
    fn test_explicit_config_path_from_env() {
        std::env::set_var(KEYSTONE_CONFIG_VAR, "/etc/keystone/custom.json");
        let path = ConfigLoader::config_file_path();
        std::env::remove_var(KEYSTONE_CONFIG_VAR);

        assert_eq!(path, Some(PathBuf::from("/etc/keystone/custom.json")));
    }
}
