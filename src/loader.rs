//! Discovers apt list files and parses them concurrently into one corpus.
//!
//! Files are enumerated in sorted path order, and that order (not task completion
//! order) decides which record wins when a package appears in several files.

use crate::config::{DescriptionMerge, EngineConfig};
use crate::error::{LoadError, SourceReadError};
use crate::model::Progress;
use crate::package::{Corpus, Record, parse_packages_file, parse_translations_file};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// The list files found in the data directory, each list in sorted path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFiles {
    pub packages: Vec<PathBuf>,
    pub translations: Vec<PathBuf>,
}

impl SourceFiles {
    /// Scan `config.data_dir` (not recursively) for Packages and Translation files.
    ///
    /// Packages files tagged `binary-<arch>` for a foreign architecture are skipped.
    pub fn discover(config: &EngineConfig) -> Self {
        let mut files = Self::default();

        let walker = WalkBuilder::new(&config.data_dir)
            .max_depth(Some(1))
            .standard_filters(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error scanning {}: {}", config.data_dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };

            if file_name.ends_with(&config.packages_suffix) {
                if matches_architecture(file_name, &config.architecture) {
                    files.packages.push(entry.path().to_path_buf());
                } else {
                    tracing::debug!("Skipping {} (foreign architecture)", file_name);
                }
            } else if file_name.ends_with(&config.translations_suffix) {
                files.translations.push(entry.path().to_path_buf());
            }
        }

        files.packages.sort();
        files.translations.sort();
        files
    }
}

/// True unless the file name carries a `binary-<arch>` tag for another architecture.
pub fn matches_architecture(file_name: &str, architecture: &str) -> bool {
    let Some((_, tail)) = file_name.split_once("binary-") else {
        return true;
    };
    let tag = tail.split('_').next().unwrap_or_default();
    tag == architecture || tag == "all"
}

/// Outcome of a full load from the list files.
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub corpus: Corpus,
    /// Packages files that were parsed successfully
    pub package_files: usize,
    /// Files (of either kind) that could not be read
    pub failed_files: usize,
    /// Records whose description came from a Translation file
    pub translated: usize,
}

enum Parsed {
    Packages(Result<Vec<Record>, SourceReadError>),
    Translations(Result<BTreeMap<String, String>, SourceReadError>),
}

/// Slot of a parse task: which list, and the file's position in it.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Packages(usize),
    Translations(usize),
}

/// Parses discovered list files on a bounded pool of blocking tasks.
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    data_dir: PathBuf,
    max_workers: usize,
    merge: DescriptionMerge,
}

impl CorpusLoader {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            max_workers: config.max_workers.max(1),
            merge: config.merge,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Parse all `files` and merge them into a corpus.
    ///
    /// Unreadable files are logged and contribute nothing. Fails only if no Packages
    /// file could be read at all.
    pub async fn load(
        &self,
        files: SourceFiles,
        progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<LoadedCorpus, LoadError> {
        let start = Instant::now();
        progress(Progress::Working(format!(
            "Reading {} Packages files…",
            files.packages.len()
        )));

        let mut packages: Vec<Option<Vec<Record>>> = vec![None; files.packages.len()];
        let mut translations: Vec<Option<BTreeMap<String, String>>> =
            vec![None; files.translations.len()];
        let mut failed_files = 0;

        let jobs = files
            .packages
            .into_iter()
            .enumerate()
            .map(|(i, path)| (Slot::Packages(i), path))
            .chain(
                files
                    .translations
                    .into_iter()
                    .enumerate()
                    .map(|(i, path)| (Slot::Translations(i), path)),
            );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();
        for (slot, path) in jobs {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| LoadError::Task(e.to_string()))?;
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let parsed = match slot {
                    Slot::Packages(_) => Parsed::Packages(parse_packages_file(&path)),
                    Slot::Translations(_) => Parsed::Translations(parse_translations_file(&path)),
                };
                (slot, parsed)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (slot, parsed) = joined.map_err(|e| LoadError::Task(e.to_string()))?;
            match (slot, parsed) {
                (Slot::Packages(i), Parsed::Packages(Ok(records))) => {
                    tracing::debug!("Parsed {} packages (file #{})", records.len(), i);
                    packages[i] = Some(records);
                }
                (Slot::Translations(i), Parsed::Translations(Ok(descriptions))) => {
                    tracing::debug!("Parsed {} descriptions (file #{})", descriptions.len(), i);
                    translations[i] = Some(descriptions);
                }
                (_, Parsed::Packages(Err(e)) | Parsed::Translations(Err(e))) => {
                    tracing::warn!("{}", e);
                    failed_files += 1;
                }
                (slot, _) => tracing::error!("Parse result does not match task {:?}", slot),
            }
        }

        let package_files = packages.iter().filter(|p| p.is_some()).count();
        if package_files == 0 {
            return Err(LoadError::NoReadableSources {
                data_dir: self.data_dir.clone(),
            });
        }

        let mut corpus = Corpus::from_batches(packages.into_iter().flatten());
        let translated = self.apply_translations(&mut corpus, translations.into_iter().flatten());

        tracing::info!(
            "Read {} packages from {} Packages files ({} unreadable, {} translated) in {:?}",
            corpus.len(),
            package_files,
            failed_files,
            translated,
            start.elapsed()
        );
        progress(Progress::Working(format!(
            "Read {} packages from {} Packages files in {:.1}sec…",
            corpus.len(),
            package_files,
            start.elapsed().as_secs_f64()
        )));

        Ok(LoadedCorpus {
            corpus,
            package_files,
            failed_files,
            translated,
        })
    }

    /// Merge translated descriptions in file order; the first file naming a package wins.
    fn apply_translations<I>(&self, corpus: &mut Corpus, batches: I) -> usize
    where
        I: IntoIterator<Item = BTreeMap<String, String>>,
    {
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        for batch in batches {
            for (name, description) in batch {
                merged.entry(name).or_insert(description);
            }
        }

        let mut translated = 0;
        for (name, description) in merged {
            if let Some(record) = corpus.get_mut(&name) {
                self.merge.apply(&mut record.description, &description);
                if record.description == description {
                    translated += 1;
                }
            }
        }
        translated
    }
}
