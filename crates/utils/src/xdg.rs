use keystone_core::constants::{CONFIG_DIR_NAME, DEFAULT_CACHE_DIR_NAME, DEFAULT_LOCK_DB_NAME};
use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for keystone
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_DATA_HOME/keystone or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(dirs::data_dir)
            .unwrap_or_else(env::temp_dir)
            .join(CONFIG_DIR_NAME)
    }

    /// Default root for the filesystem cache driver
    ///
    /// Lives under the system temp directory so that every process on the
    /// host agrees on it without configuration.
    pub fn default_cache_root() -> PathBuf {
        env::temp_dir().join(DEFAULT_CACHE_DIR_NAME)
    }

    /// Default SQLite database shared by lock holders
    pub fn default_lock_db() -> PathBuf {
        Self::data_dir().join(DEFAULT_LOCK_DB_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_data_dir_honours_xdg() {
        let previous = env::var("XDG_DATA_HOME").ok();
        env::set_var("XDG_DATA_HOME", "/srv/data");

        assert_eq!(XdgPaths::data_dir(), PathBuf::from("/srv/data/keystone"));
        assert_eq!(
            XdgPaths::default_lock_db(),
            PathBuf::from("/srv/data/keystone/keystone-locks.sqlite3")
        );

        match previous {
            Some(value) => env::set_var("XDG_DATA_HOME", value),
            None => env::remove_var("XDG_DATA_HOME"),
        }
    }

    #[test]
    fn test_cache_root_under_temp() {
        assert!(XdgPaths::default_cache_root().starts_with(env::temp_dir()));
    }
}
