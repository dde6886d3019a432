//! The engine facade: owns the corpus and indices, loads them, answers queries.
//!
//! State lives behind an `Arc` that is swapped in one step once a load completes, so
//! readers always see either the previous complete state or the new one.

use crate::cache::{CacheStore, Snapshot};
use crate::config::EngineConfig;
use crate::error::{ConfigError, LoadError};
use crate::loader::{CorpusLoader, SourceFiles};
use crate::package::Record;
use crate::search::{Indices, NameFilters, Query, QueryContext, StemmedIndex, Tokenizer};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// A progress notification emitted during [`Model::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Loading is under way
    Working(String),
    /// The engine is queryable; emitted exactly once per load, including failed ones
    Ready(String),
}

impl Progress {
    pub fn message(&self) -> &str {
        match self {
            Self::Working(message) | Self::Ready(message) => message,
        }
    }

    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Where a load got its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    ListFiles {
        package_files: usize,
        failed_files: usize,
    },
}

/// Summary of a completed load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: LoadSource,
    pub packages: usize,
    pub elapsed: Duration,
    /// False if a freshly built index could not be written to the cache
    pub cached: bool,
}

/// The package index engine.
pub struct Model {
    config: EngineConfig,
    tokenizer: Arc<Tokenizer>,
    filters: NameFilters,
    cache: Option<CacheStore>,
    state: RwLock<Arc<Snapshot>>,
    /// Serializes loads; a second refresh waits for the first to finish
    load_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("data_dir", &self.config.data_dir)
            .field("packages", &self.len())
            .field("cache", &self.cache.as_ref().map(CacheStore::current_path))
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create an empty engine. Call [`Model::load`] before querying.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let tokenizer = Tokenizer::new(config.stemmer_algorithm()?);
        let filters = NameFilters {
            libraries: config.library_filter.clone(),
            doc_suffixes: config.doc_suffixes.clone(),
        };
        let cache = config
            .cache
            .enabled
            .then(|| CacheStore::new(&config.cache));

        Ok(Self {
            config,
            tokenizer: Arc::new(tokenizer),
            filters,
            cache,
            state: RwLock::new(Arc::new(Snapshot::default())),
            load_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Restore today's cache, or read and index the list files.
    ///
    /// With `refresh` the cache is ignored and rebuilt. `progress` receives any number of
    /// [`Progress::Working`] messages and exactly one [`Progress::Ready`]. On failure the
    /// previous state stays in place and queryable.
    pub async fn load<F>(&self, mut progress: F, refresh: bool) -> Result<LoadReport, LoadError>
    where
        F: FnMut(Progress) + Send,
    {
        let _guard = self.load_lock.lock().await;
        let start = Instant::now();

        if !refresh && let Some(report) = self.load_from_cache(&mut progress, start).await {
            return Ok(report);
        }

        match self.rebuild(&mut progress, start).await {
            Ok(report) => {
                let mut message = format!(
                    "Read and indexed {} packages in {:.1}sec.",
                    report.packages,
                    report.elapsed.as_secs_f64()
                );
                if !report.cached && self.cache.is_some() {
                    message.push_str(" (index could not be cached)");
                }
                progress(Progress::Ready(message));
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Load failed: {}", e);
                progress(Progress::Ready(format!(
                    "Failed to load packages: {}. {} packages available.",
                    e,
                    self.len()
                )));
                Err(e)
            }
        }
    }

    async fn load_from_cache(
        &self,
        progress: &mut (dyn FnMut(Progress) + Send),
        start: Instant,
    ) -> Option<LoadReport> {
        let store = self.cache.clone()?;
        if !store.current_path().exists() {
            return None;
        }

        progress(Progress::Working("Reading cache…".to_string()));
        let snapshot = match tokio::task::spawn_blocking(move || store.try_load()).await {
            Ok(snapshot) => snapshot?,
            Err(e) => {
                tracing::warn!("Cache load task failed: {}", e);
                return None;
            }
        };

        let packages = snapshot.corpus.len();
        self.install(snapshot);
        let elapsed = start.elapsed();
        tracing::info!("Restored {} packages from cache in {:?}", packages, elapsed);
        progress(Progress::Ready(format!(
            "Read {} packages and indexes in {:.1}sec.",
            packages,
            elapsed.as_secs_f64()
        )));

        Some(LoadReport {
            source: LoadSource::Cache,
            packages,
            elapsed,
            cached: true,
        })
    }

    async fn rebuild(
        &self,
        progress: &mut (dyn FnMut(Progress) + Send),
        start: Instant,
    ) -> Result<LoadReport, LoadError> {
        let files = SourceFiles::discover(&self.config);
        tracing::debug!(
            "Found {} Packages and {} Translation files in {}",
            files.packages.len(),
            files.translations.len(),
            self.config.data_dir.display()
        );

        let loaded = CorpusLoader::new(&self.config).load(files, progress).await?;
        let packages = loaded.corpus.len();

        progress(Progress::Working(format!("Indexing {} packages…", packages)));
        let tokenizer = Arc::clone(&self.tokenizer);
        let corpus = loaded.corpus;
        let snapshot = tokio::task::spawn_blocking(move || {
            let indices = Indices::build(&corpus, &tokenizer);
            Snapshot { corpus, indices }
        })
        .await
        .map_err(|e| LoadError::Task(e.to_string()))?;
        let snapshot = Arc::new(snapshot);

        self.install_arc(Arc::clone(&snapshot));

        let cached = match self.cache.clone() {
            Some(store) => {
                let result = tokio::task::spawn_blocking(move || store.save(&snapshot)).await;
                match result {
                    Ok(Ok(path)) => {
                        tracing::debug!("Saved index cache to {}", path.display());
                        true
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("{}", e);
                        false
                    }
                    Err(e) => {
                        tracing::warn!("Cache save task failed: {}", e);
                        false
                    }
                }
            }
            None => false,
        };

        Ok(LoadReport {
            source: LoadSource::ListFiles {
                package_files: loaded.package_files,
                failed_files: loaded.failed_files,
            },
            packages,
            elapsed: start.elapsed(),
            cached,
        })
    }

    fn install(&self, snapshot: Snapshot) {
        self.install_arc(Arc::new(snapshot));
    }

    fn install_arc(&self, snapshot: Arc<Snapshot>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Names of all packages matching `query`.
    pub fn query(&self, query: &Query) -> BTreeSet<String> {
        let snapshot = self.snapshot();
        let ctx = QueryContext {
            indices: &snapshot.indices,
            tokenizer: &self.tokenizer,
            filters: &self.filters,
        };
        ctx.evaluate(query, snapshot.corpus.names())
    }

    pub fn record_for(&self, name: &str) -> Option<Record> {
        self.snapshot().corpus.get(name).cloned()
    }

    /// The description of `name`, or an empty string for unknown packages.
    pub fn description_for(&self, name: &str) -> String {
        self.snapshot()
            .corpus
            .get(name)
            .map(|record| record.description.clone())
            .unwrap_or_default()
    }

    pub fn all_sections(&self) -> BTreeSet<String> {
        self.snapshot()
            .indices
            .sections
            .keys()
            .map(str::to_string)
            .collect()
    }

    pub fn all_names(&self) -> BTreeSet<String> {
        self.snapshot().corpus.names().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the name list and the three indices as sorted text files into `dir`.
    ///
    /// Produces `allnames.txt`, `stemmednames.txt`, `stemmeddescs.txt` and `sections.txt`.
    pub fn dump_indices(&self, dir: &Path) -> std::io::Result<()> {
        let snapshot = self.snapshot();
        std::fs::create_dir_all(dir)?;

        let mut names = String::new();
        for name in snapshot.corpus.names() {
            names.push_str(name);
            names.push('\n');
        }
        std::fs::write(dir.join("allnames.txt"), names)?;

        let indices = &snapshot.indices;
        std::fs::write(dir.join("stemmednames.txt"), render_index(&indices.names))?;
        std::fs::write(dir.join("stemmeddescs.txt"), render_index(&indices.descriptions))?;
        std::fs::write(dir.join("sections.txt"), render_index(&indices.sections))?;
        tracing::info!("Dumped indices to {}", dir.display());
        Ok(())
    }
}

/// One line per key: `key name, name, ...`.
fn render_index(index: &StemmedIndex) -> String {
    let mut out = String::new();
    for (key, names) in index.iter() {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let _ = writeln!(out, "{} {}", key, names.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn test_progress_accessors() {
        let working = Progress::Working("Reading…".to_string());
        let ready = Progress::Ready("Done.".to_string());
        check!(!working.is_done());
        check!(ready.is_done());
        check!(ready.message() == "Done.");
    }

    #[test]
    fn test_new_model_is_empty() {
        let model = Model::new(EngineConfig::default()).unwrap();
        check!(model.is_empty());
        check!(model.query(&Query::new()).is_empty());
        check!(model.record_for("anything").is_none());
        check!(model.description_for("anything").is_empty());
        check!(model.all_sections().is_empty());
    }

    #[test]
    fn test_render_index() {
        let mut index = StemmedIndex::default();
        index.insert("web", "b");
        index.insert("web", "a");
        index.insert("editor", "vim");
        check!(render_index(&index) == "editor vim\nweb a, b\n");
    }
}
