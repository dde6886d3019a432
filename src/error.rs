//! Error handling types and utilities.

use std::path::PathBuf;

/// A specialized Result type for debfind operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods at the application edge. The engine itself returns the
/// typed errors below so callers can tell recoverable failures apart.
pub type Result<T> = anyhow::Result<T>;

/// A Packages or Translation file could not be opened or read.
///
/// Recovered locally by the loader: the file contributes zero records.
#[derive(Debug, thiserror::Error)]
#[error("failed to read {}: {source}", path.display())]
pub struct SourceReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure while reading or writing the dated index cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache file exists but could not be decoded, or has the wrong format version.
    #[error("cache at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The cache file could not be written (disk full, permissions, ...).
    #[error("failed to write cache to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded.
    #[error("failed to encode cache for {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
}

/// Failure of a full corpus load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No Packages file in the data directory could be read.
    #[error("no readable Packages files found in {}", data_dir.display())]
    NoReadableSources { data_dir: PathBuf },

    /// A parse task panicked or was cancelled.
    #[error("parse task failed: {0}")]
    Task(String),
}

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported stemmer language '{0}'")]
    UnknownLanguage(String),
}
