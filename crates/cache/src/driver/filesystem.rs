//! One file per key, with the file's mtime doubling as its expiry

use super::{Capabilities, Driver, EntrySummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keystone_codec::{Codec, Document};
use keystone_core::{Error, IoResultExt, Result};
use keystone_utils::{is_swap_file, write_stamped, RetryConfig};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;

/// Suffix of every entry file
const ENTRY_SUFFIX: &str = ".cache.json";

/// Suffix of the file holding the key of a hashed entry
const KEY_SUFFIX: &str = ".key";

/// Marks stems that are a digest of the key rather than its encoding
const HASHED_PREFIX: &str = "~";

/// Longest file name most filesystems accept, in bytes
const MAX_FILE_NAME: usize = 255;

/// Characters kept verbatim in entry file names
const KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// mtime stamped on entries that never expire (2400-01-01T00:00:00Z)
const NEVER_EXPIRES_SECS: u64 = 13_569_465_600;

/// Swap files older than this are treated as abandoned by `clean`
const SWAP_STALE_AFTER: Duration = Duration::from_secs(10 * 60);

fn never_expires() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(NEVER_EXPIRES_SECS)
}

/// Entries stored as files under a root directory
///
/// Each write lands in a uniquely named swap file whose mtime is set to
/// the entry's expiry before it is renamed over the entry file, so readers
/// only ever see complete entries carrying the right expiry.
#[derive(Debug)]
pub struct FilesystemDriver {
    root: PathBuf,
    codec: Arc<dyn Codec>,
    retry: RetryConfig,
}

impl FilesystemDriver {
    pub const ID: &'static str = "filesystem";

    pub fn new(root: impl Into<PathBuf>, codec: Arc<dyn Codec>) -> Self {
        Self {
            root: root.into(),
            codec,
            retry: RetryConfig::for_filesystem(),
        }
    }

    /// Override the retry policy used for mtime stamping and renames
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic file for a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{ENTRY_SUFFIX}", Self::stem_for(key)))
    }

    /// Percent-encoded key, or a SHA-256 digest of it when the encoding
    /// would not fit in a file name
    fn stem_for(key: &str) -> String {
        let encoded = utf8_percent_encode(key, KEY_ESCAPE).to_string();
        if encoded.len() + ENTRY_SUFFIX.len() <= MAX_FILE_NAME {
            encoded
        } else {
            format!("{HASHED_PREFIX}{}", hex::encode(Sha256::digest(key.as_bytes())))
        }
    }

    fn key_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}{KEY_SUFFIX}"))
    }

    /// Key of an encoded entry file; hashed entries keep theirs in a key file
    fn key_for(file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(ENTRY_SUFFIX)?;
        if stem.starts_with(HASHED_PREFIX) {
            return None;
        }
        percent_decode_str(stem)
            .decode_utf8()
            .ok()
            .map(|key| key.into_owned())
    }

    /// Metadata of a live entry; expired entries read as absent
    async fn live_metadata(&self, path: &Path) -> Result<Option<Metadata>> {
        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::file_system(path, "stat entry", e)),
        };
        let mtime = metadata.modified().at_path(path, "read entry mtime")?;
        Ok((mtime > SystemTime::now()).then_some(metadata))
    }

    async fn hashed_key(&self, file_name: &str) -> Option<String> {
        let stem = file_name
            .strip_suffix(ENTRY_SUFFIX)
            .filter(|stem| stem.starts_with(HASHED_PREFIX))?;
        fs::read_to_string(self.key_path(stem)).await.ok()
    }

    /// Remove an entry file along with the key file of a hashed entry
    async fn remove_entry(&self, key: &str) -> Result<()> {
        let stem = Self::stem_for(key);
        Self::remove_quietly(&self.root.join(format!("{stem}{ENTRY_SUFFIX}"))).await?;
        if stem.starts_with(HASHED_PREFIX) {
            Self::remove_quietly(&self.key_path(&stem)).await?;
        }
        Ok(())
    }

    async fn remove_quietly(path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::file_system(path, "remove entry", e)),
        }
    }

    async fn read_dir_entries(&self) -> Result<Vec<(String, PathBuf, Metadata)>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::file_system(&self.root, "read cache directory", e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .at_path(&self.root, "read cache directory")?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Entries can vanish between listing and stat
            if let Ok(metadata) = entry.metadata().await {
                entries.push((name, entry.path(), metadata));
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl Driver for FilesystemDriver {
    fn id(&self) -> &str {
        Self::ID
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::HAS | Capabilities::SIZE | Capabilities::LIST | Capabilities::CLEAN
    }

    async fn can_load(&self) -> bool {
        if let Err(e) = fs::create_dir_all(&self.root).await {
            tracing::warn!(root = %self.root.display(), error = %e, "cannot create cache directory");
            return false;
        }

        let probe = self.root.join(format!(".probe-{}", uuid::Uuid::new_v4()));
        match fs::write(&probe, b"").await {
            Ok(()) => {
                let _ = fs::remove_file(&probe).await;
                true
            }
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "cache directory is not writable");
                false
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &Document,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let content = self.codec.encode(value)?;
        let stem = Self::stem_for(key);
        let path = self.root.join(format!("{stem}{ENTRY_SUFFIX}"));
        let mtime = expires_at.map_or_else(never_expires, SystemTime::from);
        let retry = self.retry.clone();

        tokio::task::spawn_blocking(move || write_stamped(&path, &content, mtime, &retry))
            .await
            .map_err(|e| Error::worker(format!("filesystem write task failed: {e}")))??;

        if stem.starts_with(HASHED_PREFIX) {
            let key_path = self.key_path(&stem);
            fs::write(&key_path, key)
                .await
                .map_err(|e| Error::file_system(&key_path, "write entry key", e))?;
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Document>> {
        let path = self.path_for(key);
        if self.live_metadata(&path).await?.is_none() {
            self.remove_entry(key).await?;
            return Ok(None);
        }

        match fs::read(&path).await {
            Ok(bytes) => self.codec.decode(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::file_system(&path, "read entry", e)),
        }
    }

    async fn unset(&self, key: &str) -> Result<()> {
        self.remove_entry(key).await
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.live_metadata(&self.path_for(key)).await?.is_some())
    }

    async fn size(&self, key: &str) -> Result<Option<u64>> {
        Ok(self
            .live_metadata(&self.path_for(key))
            .await?
            .map(|metadata| metadata.len()))
    }

    async fn list(&self) -> Result<Vec<EntrySummary>> {
        let now = SystemTime::now();
        let mut summaries = Vec::new();

        for (name, _, metadata) in self.read_dir_entries().await? {
            let id = match Self::key_for(&name) {
                Some(id) => id,
                None => match self.hashed_key(&name).await {
                    Some(id) => id,
                    None => continue,
                },
            };
            let Ok(mtime) = metadata.modified() else {
                continue;
            };
            if mtime <= now {
                continue;
            }

            summaries.push(EntrySummary {
                id,
                created: metadata.created().ok().map(DateTime::<Utc>::from),
                expiry: (mtime < never_expires()).then(|| DateTime::<Utc>::from(mtime)),
            });
        }

        Ok(summaries)
    }

    async fn clean(&self) -> Result<()> {
        let now = SystemTime::now();
        let mut removed = 0usize;

        for (name, path, metadata) in self.read_dir_entries().await? {
            let stale = if is_swap_file(&name) {
                metadata
                    .created()
                    .ok()
                    .and_then(|created| now.duration_since(created).ok())
                    .is_some_and(|age| age > SWAP_STALE_AFTER)
            } else if name.ends_with(ENTRY_SUFFIX) {
                metadata.modified().is_ok_and(|mtime| mtime <= now)
            } else if let Some(stem) = name.strip_suffix(KEY_SUFFIX) {
                // Key files outlive their entry only when a removal was cut short
                let entry = self.root.join(format!("{stem}{ENTRY_SUFFIX}"));
                !fs::try_exists(&entry).await.unwrap_or(true)
            } else {
                false
            };

            if stale {
                Self::remove_quietly(&path).await?;
                if let Some(stem) = name
                    .strip_suffix(ENTRY_SUFFIX)
                    .filter(|stem| stem.starts_with(HASHED_PREFIX))
                {
                    Self::remove_quietly(&self.key_path(stem)).await?;
                }
                removed += 1;
            }
        }

        tracing::debug!(driver = Self::ID, removed, "cleaned expired entries");
        Ok(())
    }
}
