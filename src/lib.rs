//! Stemmed keyword search over Debian package lists.
//!
//! [`Model`] reads apt's `Packages` and `Translation` files, builds inverted indices
//! over package names, descriptions and sections, caches them once per day, and
//! answers [`Query`]s with the set of matching package names.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod package;
pub mod search;
pub mod tracing;

pub use cache::{CacheStore, Snapshot};
pub use config::{CacheConfig, DescriptionMerge, EngineConfig, LibraryFilter};
pub use error::{CacheError, ConfigError, LoadError, SourceReadError};
pub use model::{LoadReport, LoadSource, Model, Progress};
pub use package::{Corpus, Record};
pub use search::{Indices, MatchMode, Query, StemmedIndex, Tokenizer};
