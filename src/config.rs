//! Engine configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a working
//! configuration that reads the system apt lists and caches under the temp directory.

use crate::error::ConfigError;
use rust_stemmers::Algorithm;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where apt keeps its downloaded package lists.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/apt/lists";

/// Configuration for the indexing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory scanned (non-recursively) for Packages and Translation files
    pub data_dir: PathBuf,

    /// Filename suffix identifying Packages files
    pub packages_suffix: String,

    /// Filename suffix identifying long-description Translation files
    pub translations_suffix: String,

    /// Debian architecture tag; Packages files tagged for another arch are skipped
    pub architecture: String,

    /// Maximum number of files parsed concurrently
    pub max_workers: usize,

    /// Snowball stemmer language
    pub language: String,

    /// How Translation descriptions combine with Packages descriptions
    pub merge: DescriptionMerge,

    /// Heuristic deciding which package names count as libraries
    pub library_filter: LibraryFilter,

    /// Name suffixes identifying documentation packages
    pub doc_suffixes: Vec<String>,

    /// Index cache settings
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            packages_suffix: "Packages".to_string(),
            translations_suffix: "i18n_Translation-en".to_string(),
            architecture: native_architecture().to_string(),
            max_workers: default_max_workers(),
            language: "english".to_string(),
            merge: DescriptionMerge::default(),
            library_filter: LibraryFilter::default(),
            doc_suffixes: vec!["-doc".to_string(), "-docs".to_string()],
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read a configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, otherwise the user config file if it exists, otherwise defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Using config file {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Resolve the configured language to a stemming algorithm.
    pub fn stemmer_algorithm(&self) -> Result<Algorithm, ConfigError> {
        parse_algorithm(&self.language)
    }
}

/// Settings for the dated on-disk cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Set to false to always rebuild and never write a cache
    pub enabled: bool,

    /// Directory holding cache files
    pub dir: PathBuf,

    /// Filename prefix; the full name is `{prefix}-{YYYY-MM-DD}.cache`
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: std::env::temp_dir(),
            prefix: "debfind".to_string(),
        }
    }
}

/// Precedence between a Packages description and a Translation description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DescriptionMerge {
    /// The Translation description always wins when one exists
    #[default]
    Replace,
    /// The Translation description is only used when the Packages one is empty
    FillEmpty,
}

impl DescriptionMerge {
    /// Pick the description to keep for a record.
    pub fn apply(self, current: &mut String, translated: &str) {
        match self {
            Self::Replace => translated.clone_into(current),
            Self::FillEmpty if current.trim().is_empty() => translated.clone_into(current),
            Self::FillEmpty => {}
        }
    }
}

/// Decides which package names are "libraries" for the include-libraries filter.
///
/// A name is a library when it starts with `prefix`, contains `marker`, and does not
/// start with any of `exceptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryFilter {
    pub prefix: String,
    pub marker: String,
    pub exceptions: Vec<String>,
}

impl Default for LibraryFilter {
    fn default() -> Self {
        Self {
            prefix: "lib".to_string(),
            marker: "-lib".to_string(),
            exceptions: vec!["libre".to_string()],
        }
    }
}

impl LibraryFilter {
    pub fn is_library(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
            && name.contains(&self.marker)
            && !self.exceptions.iter().any(|e| name.starts_with(e.as_str()))
    }
}

/// The Debian architecture tag matching the target this binary was built for.
pub fn native_architecture() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        "riscv64" => "riscv64",
        "s390x" => "s390x",
        other => other,
    }
}

/// `$XDG_CONFIG_HOME/debfind/config.toml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("debfind").join("config.toml"))
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

fn parse_algorithm(language: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = match language.to_ascii_lowercase().as_str() {
        "danish" => Algorithm::Danish,
        "dutch" => Algorithm::Dutch,
        "en" | "english" => Algorithm::English,
        "finnish" => Algorithm::Finnish,
        "french" => Algorithm::French,
        "german" => Algorithm::German,
        "hungarian" => Algorithm::Hungarian,
        "italian" => Algorithm::Italian,
        "norwegian" => Algorithm::Norwegian,
        "portuguese" => Algorithm::Portuguese,
        "romanian" => Algorithm::Romanian,
        "russian" => Algorithm::Russian,
        "spanish" => Algorithm::Spanish,
        "swedish" => Algorithm::Swedish,
        "turkish" => Algorithm::Turkish,
        _ => return Err(ConfigError::UnknownLanguage(language.to_string())),
    };
    Ok(algorithm)
}
