/// Constants used throughout the keystone crates
// Configuration file
pub const CONFIG_DIR_NAME: &str = "keystone";
pub const CONFIG_FILE_NAME: &str = "config.json";

// Environment variable names
pub const KEYSTONE_CONFIG_VAR: &str = "KEYSTONE_CONFIG";
pub const KEYSTONE_CACHE_DRIVERS_VAR: &str = "KEYSTONE_CACHE_DRIVERS";
pub const KEYSTONE_CACHE_PREFIX_VAR: &str = "KEYSTONE_CACHE_PREFIX";
pub const KEYSTONE_CACHE_DIR_VAR: &str = "KEYSTONE_CACHE_DIR";
pub const KEYSTONE_CACHE_AUTO_CLEAN_VAR: &str = "KEYSTONE_CACHE_AUTO_CLEAN";
pub const KEYSTONE_LOCK_BACKEND_VAR: &str = "KEYSTONE_LOCK_BACKEND";
pub const KEYSTONE_LOCK_DB_VAR: &str = "KEYSTONE_LOCK_DB";
pub const KEYSTONE_LOCK_EXPIRY_VAR: &str = "KEYSTONE_LOCK_EXPIRY";
pub const KEYSTONE_LOCK_TTL_VAR: &str = "KEYSTONE_LOCK_TTL";
pub const KEYSTONE_THROTTLE_WAIT_VAR: &str = "KEYSTONE_THROTTLE_WAIT";

// Cache defaults
pub const DEFAULT_CACHE_DIR_NAME: &str = "keystone-cache";
pub const DEFAULT_DRAIN_INITIAL_WAIT_MS: u64 = 25;
pub const DEFAULT_DRAIN_MAX_ATTEMPTS: u32 = 10;

// Lock defaults
pub const DEFAULT_LOCK_EXPIRY_SECS: u64 = 60 * 60;
pub const DEFAULT_LOCK_TTL_SECS: u64 = 60;
pub const DEFAULT_LOCK_TABLE: &str = "locks";
pub const DEFAULT_LOCK_DB_NAME: &str = "keystone-locks.sqlite3";

// Throttle defaults
pub const DEFAULT_THROTTLE_QUEUE_DEPTH: usize = 1;
pub const DEFAULT_THROTTLE_RETRY_INTERVAL_MS: u64 = 100;
