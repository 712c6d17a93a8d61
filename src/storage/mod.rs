// SPDX-License-Identifier: PMPL-1.0-or-later

//! Content-addressed detection cache
//!
//! Two tiers keyed by the blake3 digest of the source file: an in-process
//! map shared by every detection on this `ContentCache`, and one JSON file
//! per digest under the cache directory. The presence of
//! `modules_<digest>.json` is the only index.

use crate::error::DetectError;
use crate::types::CacheEntry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const ENTRY_PREFIX: &str = "modules_";
const DIGEST_CHUNK: usize = 64 * 1024;

/// Stream `path` through blake3 without loading it whole.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last modification time of `path` as a UTC timestamp.
pub fn modified_at(path: &Path) -> io::Result<DateTime<Utc>> {
    let metadata = fs::metadata(path)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    DateTime::from_timestamp(mtime.unix_seconds(), mtime.nanoseconds())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "modification time out of range"))
}

pub struct ContentCache {
    dir: PathBuf,
    ttl: Duration,
    memory: Mutex<HashMap<String, Arc<CacheEntry>>>,
}

impl ContentCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", ENTRY_PREFIX, key))
    }

    fn memory(&self) -> MutexGuard<'_, HashMap<String, Arc<CacheEntry>>> {
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up `key`, memory first, then disk.
    ///
    /// An entry is usable when it is younger than the ttl, the source has
    /// not been modified after the entry was written, and (when
    /// `environment` is given) it was produced in the same environment.
    /// A disk hit is promoted into memory.
    pub fn get(
        &self,
        key: &str,
        source_mtime: DateTime<Utc>,
        environment: Option<&str>,
    ) -> Option<Arc<CacheEntry>> {
        {
            let mut memory = self.memory();
            if let Some(entry) = memory.get(key) {
                if self.is_valid(entry, key, source_mtime, environment) {
                    return Some(Arc::clone(entry));
                }
                memory.remove(key);
            }
        }

        let entry = match self.read_disk(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                // left on disk for inspection; the next put overwrites it
                tracing::warn!(error = %err, "ignoring cache entry");
                return None;
            }
        };

        if !self.is_valid(&entry, key, source_mtime, environment) {
            tracing::debug!(key, "stale disk cache entry");
            return None;
        }

        let entry = Arc::new(entry);
        self.memory().insert(key.to_string(), Arc::clone(&entry));
        Some(entry)
    }

    fn is_valid(
        &self,
        entry: &CacheEntry,
        key: &str,
        source_mtime: DateTime<Utc>,
        environment: Option<&str>,
    ) -> bool {
        if entry.content_hash != key {
            return false;
        }
        let age = Utc::now().signed_duration_since(entry.timestamp);
        let fresh = age
            .to_std()
            .map(|age| age < self.ttl)
            // timestamp in the future: clock skew, still usable
            .unwrap_or(true);
        if !fresh || source_mtime > entry.timestamp {
            return false;
        }
        match environment {
            Some(current) => entry.environment.as_deref() == Some(current),
            None => true,
        }
    }

    fn read_disk(&self, key: &str) -> Result<Option<CacheEntry>, DetectError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(DetectError::CacheCorruption {
                    path,
                    reason: err.to_string(),
                })
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| DetectError::CacheCorruption {
                path,
                reason: err.to_string(),
            })
    }

    /// Store `entry` in both tiers. The memory tier is always updated; a
    /// failed disk write is returned to the caller.
    pub fn put(&self, key: &str, entry: CacheEntry) -> Result<Arc<CacheEntry>> {
        let entry = Arc::new(entry);
        self.memory().insert(key.to_string(), Arc::clone(&entry));

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache directory {}", self.dir.display()))?;
        let path = self.entry_path(key);
        let staging = path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(entry.as_ref())?;
        fs::write(&staging, payload)
            .with_context(|| format!("writing cache entry {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("publishing cache entry {}", path.display()))?;

        tracing::info!(path = %path.display(), "cache entry written");
        Ok(entry)
    }

    pub fn invalidate(&self, key: &str) -> Result<()> {
        self.memory().remove(key);
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing {}", path.display())),
        }
    }

    /// Empty both tiers. Entries already handed out stay valid for
    /// whoever holds them.
    pub fn clear(&self) -> Result<()> {
        self.memory().clear();
        for path in self.disk_entries()? {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }

    pub fn memory_count(&self) -> usize {
        self.memory().len()
    }

    pub fn disk_count(&self) -> usize {
        self.disk_entries().map(|entries| entries.len()).unwrap_or(0)
    }

    fn disk_entries(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("listing cache directory {}", self.dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                let is_json = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false);
                let ours = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(ENTRY_PREFIX))
                    .unwrap_or(false);
                is_json && ours
            })
            .collect();
        Ok(entries)
    }
}
