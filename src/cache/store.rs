//! Disk-backed response store
//!
//! Each entry is two files in the cache directory: `<key>.json` holds the raw
//! payload and `<key>.meta` holds when it was written and for how long it is
//! valid. An entry is only trusted when both files are present and the
//! metadata parses; anything else is deleted on sight.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

const DATA_EXT: &str = "json";
const META_EXT: &str = "meta";

/// Errors that can occur when writing to or clearing the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Creating the cache directory failed
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    /// Writing the payload file failed
    #[error("failed to write cache data: {0}")]
    WriteData(io::Error),

    /// Writing the metadata file failed; the payload was removed
    #[error("failed to write cache metadata: {0}")]
    WriteMeta(io::Error),

    /// Metadata could not be serialized
    #[error("failed to encode cache metadata: {0}")]
    EncodeMeta(#[from] serde_json::Error),

    /// Listing or removing files during clear failed
    #[error("failed to clear cache directory {path}: {source}")]
    Clear { path: PathBuf, source: io::Error },
}

/// Freshness record stored next to each payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct EntryMeta {
    /// Seconds since epoch when the payload was written
    created_at: i64,
    /// Seconds the payload stays valid
    ttl: i64,
}

/// TTL-based store for raw response bodies
///
/// A store with a TTL of zero or less is disabled. Its operations still work,
/// but callers are expected to check [`CacheStore::is_enabled`] first.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    dir: PathBuf,
    /// Lifetime of new entries, in seconds
    ttl: i64,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, ttl_secs: i64) -> Self {
        Self {
            dir: dir.into(),
            ttl: ttl_secs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    /// Returns true iff the configured TTL is strictly positive
    pub fn is_enabled(&self) -> bool {
        self.ttl > 0
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, DATA_EXT))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, META_EXT))
    }

    /// Reads a payload if the entry exists, is intact and has not expired
    ///
    /// Every I/O or decoding problem is a miss, and inconsistent entries are
    /// removed so the next call goes to the network.
    ///
    /// # Arguments
    /// * `key` - Cache key from [`canonicalize`](super::canonicalize)
    ///
    /// # Returns
    /// * `Some(payload)` with the exact bytes passed to `set`
    /// * `None` if the entry is missing, orphaned, corrupt or expired
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let data_path = self.data_path(key);
        let meta_path = self.meta_path(key);

        let data = fs::read(&data_path).ok()?;

        let raw_meta = match fs::read(&meta_path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(key, error = %err, "cache metadata missing, dropping payload");
                remove_quietly(&data_path);
                return None;
            }
        };

        let meta: EntryMeta = match serde_json::from_slice(&raw_meta) {
            Ok(meta) => meta,
            Err(err) => {
                debug!(key, error = %err, "cache metadata corrupt, dropping entry");
                self.delete(key);
                return None;
            }
        };

        if self.is_enabled() {
            let age = Utc::now().timestamp() - meta.created_at;
            if age > meta.ttl {
                debug!(key, age, ttl = meta.ttl, "cache entry expired");
                self.delete(key);
                return None;
            }
        }

        Some(data)
    }

    /// Stores a payload under `key`, creating the directory if needed
    ///
    /// Both files are written to a temporary name and renamed into place. If
    /// the metadata cannot be written the payload file is removed again, so an
    /// undated payload never survives.
    ///
    /// # Arguments
    /// * `key` - Cache key from [`canonicalize`](super::canonicalize)
    /// * `payload` - Raw response body to store
    ///
    /// # Returns
    /// * `Ok(())` once both files are in place
    /// * `Err(CacheError)` if the directory or either file could not be written
    pub fn set(&self, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let data_path = self.data_path(key);
        let meta_path = self.meta_path(key);

        let meta = EntryMeta {
            created_at: Utc::now().timestamp(),
            ttl: self.ttl,
        };
        let meta_bytes = serde_json::to_vec(&meta)?;

        self.write_atomic(&data_path, payload)
            .map_err(CacheError::WriteData)?;

        if let Err(err) = self.write_atomic(&meta_path, &meta_bytes) {
            remove_quietly(&data_path);
            return Err(CacheError::WriteMeta(err));
        }

        Ok(())
    }

    /// Removes both files for `key`; missing files are fine
    pub fn delete(&self, key: &str) {
        remove_quietly(&self.data_path(key));
        remove_quietly(&self.meta_path(key));
    }

    /// Removes every `*.json` and `*.meta` file in the cache directory
    ///
    /// Other files are left alone. A missing directory counts as already clear.
    pub fn clear(&self) -> Result<(), CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(CacheError::Clear {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Clear {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if is_managed(&path) {
                remove_quietly(&path);
            }
        }

        Ok(())
    }

    fn ensure_dir(&self) -> Result<(), CacheError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&self.dir).map_err(|source| CacheError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    /// Writes through a temp file in the same directory, then renames.
    /// Temp files are created owner-only on Unix.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

fn is_managed(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some(DATA_EXT) | Some(META_EXT)
        )
}

fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %err, "failed to remove cache file");
        }
    }
}
