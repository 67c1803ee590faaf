//! Configuration file and environment overlay feeding the primitives

use keystone::core::{ConfigSource, LockBackend};
use keystone::{Cache, ConfigLoader, Lock};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_file_and_environment_configure_cache_and_lock() -> keystone::Result<()> {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        r#"{
            "cache": { "drivers": ["redis", "memory"], "key_prefix": "app:" },
            "lock": { "expiry": "10m", "ttl": "30s" },
            "throttle": { "wait": "2s" }
        }"#,
    )
    .unwrap();

    let db_path = dir.path().join("data").join("locks.db");
    let env = HashMap::from([
        ("KEYSTONE_LOCK_BACKEND", "sqlite".to_string()),
        ("KEYSTONE_LOCK_DB", db_path.display().to_string()),
    ]);

    let config = ConfigLoader::load_from_path(&config_path)?;
    assert_eq!(config.source, ConfigSource::ConfigFile(config_path.clone()));
    let config = ConfigLoader::apply_env(config, |name| env.get(name).cloned())?;

    assert_eq!(config.lock.backend, LockBackend::Sqlite);
    assert_eq!(config.lock.expiry, Duration::from_secs(600));
    assert_eq!(config.throttle.wait, Duration::from_secs(2));

    let cache = Cache::from_config(&config.cache).await?;
    assert_eq!(cache.driver_id(), "memory");
    assert_eq!(cache.mangle("user"), "app:user");
    let tried: Vec<_> = cache.descriptors().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(tried, vec!["redis", "memory"]);

    let lock = Lock::from_config(&config.lock).await?;
    assert_eq!(lock.ttl(), Duration::from_secs(30));
    assert!(lock.create("deploy", None).await);
    assert!(db_path.exists());

    lock.destroy().await?;
    cache.destroy().await?;
    Ok(())
}

#[test]
fn test_unknown_backend_is_a_configuration_error() {
    let err = ConfigLoader::apply_env(Default::default(), |name| {
        (name == "KEYSTONE_LOCK_BACKEND").then(|| "postgres".to_string())
    })
    .unwrap_err();
    assert!(matches!(err, keystone::Error::Configuration { .. }));
}
