//! Extension traits for error handling

use super::types::{Error, Result};
use std::path::Path;

/// Attach a path and operation to raw I/O results
pub trait IoResultExt<T> {
    /// Convert an `io::Result` into a keystone `Result` describing where it failed
    fn at_path(self, path: &Path, operation: &str) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: &Path, operation: &str) -> Result<T> {
        self.map_err(|e| Error::file_system(path, operation, e))
    }
}

/// Extension trait for results from serialization libraries
pub trait SerializationResultExt<T> {
    /// Map any displayable failure to a serialization error with context
    fn serialization_context(self, context: &str) -> Result<T>;
}

impl<T, E> SerializationResultExt<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn serialization_context(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::serialization(context, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_at_path_keeps_location() {
        let result: std::io::Result<()> = Err(std::io::Error::from(std::io::ErrorKind::NotFound));
        match result.at_path(Path::new("/tmp/missing"), "read entry") {
            Err(Error::Io {
                path, operation, ..
            }) => {
                assert_eq!(path, PathBuf::from("/tmp/missing"));
                assert_eq!(operation, "read entry");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_serialization_context() {
        let result: std::result::Result<(), String> = Err("bad byte".to_string());
        let error = result.serialization_context("decode entry").unwrap_err();
        assert_eq!(
            error.to_string(),
            "serialization error (decode entry): bad byte"
        );
    }
}
