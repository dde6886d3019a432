//! Inverted indices from stemmed tokens (and sections) to package names.

use super::tokenize::Tokenizer;
use crate::package::Corpus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Map from key (stemmed token or section) to the names of the packages carrying it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StemmedIndex {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl StemmedIndex {
    pub fn insert(&mut self, key: &str, name: &str) {
        if let Some(names) = self.entries.get_mut(key) {
            names.insert(name.to_string());
        } else {
            self.entries
                .insert(key.to_string(), BTreeSet::from([name.to_string()]));
        }
    }

    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total key/name pairs across all keys
    pub fn posting_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }
}

/// The three indices derived from a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indices {
    /// Tokens of package names
    pub names: StemmedIndex,
    /// Tokens of package names and descriptions
    pub descriptions: StemmedIndex,
    /// Exact normalized section, not stemmed
    pub sections: StemmedIndex,
}

impl Indices {
    /// Index every record of the corpus.
    ///
    /// Name tokens go into both the name and description indices so a name-word query
    /// always finds a subset of what the same description-word query finds.
    pub fn build(corpus: &Corpus, tokenizer: &Tokenizer) -> Self {
        let start = std::time::Instant::now();
        let mut indices = Self::default();

        for record in corpus.iter() {
            let name = record.name.as_str();
            for token in tokenizer.tokenize(name) {
                indices.names.insert(&token, name);
                indices.descriptions.insert(&token, name);
            }
            for token in tokenizer.tokenize(&record.description) {
                indices.descriptions.insert(&token, name);
            }
            indices.sections.insert(&record.section, name);
        }

        tracing::info!(
            "Built indices: {} name terms, {} description terms ({} postings), {} sections in {:?}",
            indices.names.len(),
            indices.descriptions.len(),
            indices.descriptions.posting_count(),
            indices.sections.len(),
            start.elapsed()
        );

        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Record;
    use assert2::{check, let_assert};

    fn corpus() -> Corpus {
        let record = |name: &str, section: &str, description: &str| Record {
            name: name.to_string(),
            section: section.to_string(),
            description: description.to_string(),
            ..Record::default()
        };
        Corpus::from_batches([vec![
            record("python3-django", "python", "High-level Python web framework"),
            record("vim", "editors", "Vi IMproved - enhanced vi editor"),
            record("emacs", "editors", "GNU Emacs editor"),
        ]])
    }

    #[test]
    fn test_name_tokens_in_both_indices() {
        let indices = Indices::build(&corpus(), &Tokenizer::default());

        let_assert!(Some(names) = indices.names.get("django"));
        check!(names.contains("python3-django"));
        let_assert!(Some(descs) = indices.descriptions.get("django"));
        check!(descs.contains("python3-django"));
    }

    #[test]
    fn test_description_tokens_only_in_description_index() {
        let indices = Indices::build(&corpus(), &Tokenizer::default());

        check!(indices.names.get("editor").is_none());
        let_assert!(Some(editors) = indices.descriptions.get("editor"));
        check!(editors.len() == 2);
    }

    #[test]
    fn test_sections_exact() {
        let indices = Indices::build(&corpus(), &Tokenizer::default());

        let_assert!(Some(editors) = indices.sections.get("editors"));
        check!(editors.iter().collect::<Vec<_>>() == vec!["emacs", "vim"]);
        check!(indices.sections.get("editor").is_none());
    }

    #[test]
    fn test_every_name_indexed_under_its_section() {
        let corpus = corpus();
        let indices = Indices::build(&corpus, &Tokenizer::default());
        for record in corpus.iter() {
            let_assert!(Some(names) = indices.sections.get(&record.section));
            check!(names.contains(&record.name));
        }
    }
}
