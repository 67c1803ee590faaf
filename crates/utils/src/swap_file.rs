//! Swap-file writes that stamp a modification time before publishing
//!
//! The content is written to a uniquely named sibling, its mtime is set,
//! and only then is it renamed over the destination. Readers therefore see
//! either the previous file or the complete new one, never a partial write
//! or a file with a stale mtime.

use crate::backoff::{retry_blocking, RetryConfig};
use keystone_core::{Error, IoResultExt, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

/// Suffix carried by every in-progress swap file
pub const SWAP_SUFFIX: &str = ".swap";

/// Whether a directory entry name belongs to an in-progress (or abandoned) swap file
pub fn is_swap_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(SWAP_SUFFIX)
}

/// Write `content` to `path`, setting the file's mtime to `mtime`
///
/// The mtime update and the final rename are retried per `retry`. The swap
/// file is removed when any step fails.
pub fn write_stamped(
    path: &Path,
    content: &[u8],
    mtime: SystemTime,
    retry: &RetryConfig,
) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::configuration(format!("'{}' has no parent", path.display())))?;

    let swap_path = parent.join(format!(".{}{SWAP_SUFFIX}", Uuid::new_v4()));

    let result = write_swap(&swap_path, content, mtime, retry)
        .and_then(|()| rename_with_retry(&swap_path, path, retry));

    if result.is_err() {
        let _ = fs::remove_file(&swap_path);
    }
    result
}

fn write_swap(swap_path: &Path, content: &[u8], mtime: SystemTime, retry: &RetryConfig) -> Result<()> {
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(swap_path)
        .at_path(swap_path, "create swap file")?;

    file.write_all(content).at_path(swap_path, "write swap file")?;

    retry_blocking(retry, || stamp(&file, swap_path, mtime))?;

    file.sync_all().at_path(swap_path, "sync swap file")
}

fn stamp(file: &File, swap_path: &Path, mtime: SystemTime) -> Result<()> {
    file.set_modified(mtime).at_path(swap_path, "set swap file mtime")
}

fn rename_with_retry(from: &Path, to: &Path, retry: &RetryConfig) -> Result<()> {
    let destination: PathBuf = to.to_path_buf();
    retry_blocking(retry, || {
        fs::rename(from, &destination).at_path(&destination, "move swap file into place")
    })
}
