//! Dated on-disk cache of the corpus and its indices.
//!
//! One cache file per calendar day: `{prefix}-{YYYY-MM-DD}.cache`. A new day simply
//! uses a new name, so yesterday's file is never read again and is pruned on the next
//! successful save. Any file that fails to decode is deleted so it cannot fail twice.

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::package::Corpus;
use crate::search::Indices;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Bumped whenever the encoded layout of [`Snapshot`] changes.
const CACHE_FORMAT_VERSION: u32 = 1;

/// The complete engine state: records plus the three indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub corpus: Corpus,
    pub indices: Indices,
}

/// Reads and writes [`Snapshot`]s in a configured directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    prefix: String,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            prefix: config.prefix.clone(),
        }
    }

    /// The cache file used on `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}-{}.cache", self.prefix, date))
    }

    /// The cache file used today.
    pub fn current_path(&self) -> PathBuf {
        self.path_for(Local::now().date_naive())
    }

    /// Load today's cache. Missing or unreadable caches are a miss; corrupt ones are deleted.
    pub fn try_load(&self) -> Option<Snapshot> {
        self.try_load_from(&self.current_path())
    }

    pub fn try_load_from(&self, path: &Path) -> Option<Snapshot> {
        match Self::read(path) {
            Ok(Some(snapshot)) => {
                tracing::debug!(
                    "Loaded cache {} ({} packages)",
                    path.display(),
                    snapshot.corpus.len()
                );
                Some(snapshot)
            }
            Ok(None) => {
                tracing::debug!("No cache at {}", path.display());
                None
            }
            Err(e) => {
                tracing::warn!("{}; discarding it", e);
                remove_quietly(path);
                None
            }
        }
    }

    /// Write today's cache, replacing any existing file for today.
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, CacheError> {
        let path = self.current_path();
        self.save_to(&path, snapshot)?;
        self.prune_stale(&path);
        Ok(path)
    }

    /// Write `snapshot` to `path` via a temporary sibling file and a rename.
    ///
    /// On failure both the temporary file and `path` are removed.
    pub fn save_to(&self, path: &Path, snapshot: &Snapshot) -> Result<(), CacheError> {
        let tmp = path.with_extension("cache.tmp");
        let result = Self::write(&tmp, snapshot).and_then(|()| {
            fs::rename(&tmp, path).map_err(|source| CacheError::Write {
                path: path.to_path_buf(),
                source,
            })
        });

        match result {
            Ok(()) => {
                tracing::debug!("Cached {} packages to {}", snapshot.corpus.len(), path.display());
                Ok(())
            }
            Err(e) => {
                remove_quietly(&tmp);
                remove_quietly(path);
                Err(e)
            }
        }
    }

    /// Delete today's cache if present.
    pub fn delete(&self) {
        remove_quietly(&self.current_path());
    }

    /// Remove cache files from other days. Returns how many were removed.
    pub fn prune_stale(&self, keep: &Path) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let prefix = format!("{}-", self.prefix);

        let mut removed = 0;
        for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
            let is_ours = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| {
                n.starts_with(&prefix) && n.ends_with(".cache")
            });
            if is_ours && path != keep {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::debug!("Removed stale cache {}", path.display());
                        removed += 1;
                    }
                    Err(e) => tracing::debug!("Could not remove {}: {}", path.display(), e),
                }
            }
        }
        removed
    }

    fn read(path: &Path) -> Result<Option<Snapshot>, CacheError> {
        let corrupt = |reason: String| CacheError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(corrupt(e.to_string())),
        };

        let (version, rest) =
            postcard::take_from_bytes::<u32>(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if version != CACHE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "format version {} (expected {})",
                version, CACHE_FORMAT_VERSION
            )));
        }
        postcard::from_bytes(rest)
            .map(Some)
            .map_err(|e| corrupt(e.to_string()))
    }

    fn write(path: &Path, snapshot: &Snapshot) -> Result<(), CacheError> {
        let write_error = |source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(write_error)?);

        let encode_error = |e: postcard::Error| CacheError::Encode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        postcard::to_io(&CACHE_FORMAT_VERSION, &mut writer).map_err(encode_error)?;
        postcard::to_io(snapshot, &mut writer).map_err(encode_error)?;

        writer.flush().map_err(write_error)?;
        writer.get_ref().sync_all().map_err(write_error)
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
