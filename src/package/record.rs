//! Package records and the deduplicated corpus.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One package entry from a Packages file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Package name; the corpus key
    pub name: String,
    pub version: String,
    /// Last path segment of the Section field ("admin/foo" is stored as "foo")
    pub section: String,
    /// Full description, possibly multi-paragraph and possibly carrying list markers
    pub description: String,
    /// Homepage URL, empty if absent
    pub url: String,
    /// Installed size in KiB
    pub size: u64,
}

impl Record {
    /// A record is only kept once it has a name.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// The first line of the description.
    pub fn summary(&self) -> &str {
        self.description.lines().next().unwrap_or_default()
    }
}

/// Reduce a Section value to its last `/`-separated segment.
pub fn normalize_section(section: &str) -> String {
    section
        .trim()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// All records, keyed by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    records: BTreeMap<String, Record>,
}

impl Corpus {
    /// Merge record batches in the order given; the first record seen for a name wins.
    ///
    /// Batches must arrive in a stable order (the loader uses file enumeration order)
    /// for the result to be deterministic.
    pub fn from_batches<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<Record>>,
    {
        let mut corpus = Self::default();
        for record in batches.into_iter().flatten() {
            corpus.insert_first(record);
        }
        corpus
    }

    /// Insert unless a record with the same name is already present.
    /// Returns whether the record was inserted.
    pub fn insert_first(&mut self, record: Record) -> bool {
        if !record.is_valid() || self.records.contains_key(&record.name) {
            return false;
        }
        self.records.insert(record.name.clone(), record);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Record> {
        self.records.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}
