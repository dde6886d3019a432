//! Structured queries and their evaluation against the indices.

use super::index::{Indices, StemmedIndex};
use super::tokenize::Tokenizer;
use crate::config::LibraryFilter;
use crate::package::normalize_section;
use ahash::AHashSet;
use std::collections::BTreeSet;
use std::fmt;

/// How multiple query words combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// A package must match every word
    #[default]
    All,
    /// A package must match at least one word
    Any,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "All",
            Self::Any => "Any",
        })
    }
}

/// A search over the package indices. Empty fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    section: String,
    description_words: String,
    description_match: MatchMode,
    name_words: String,
    name_match: MatchMode,
    include_libraries: bool,
    include_docs: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one section; "admin/foo" is normalized to "foo".
    #[must_use]
    pub fn section(mut self, section: &str) -> Self {
        self.section = normalize_section(section);
        self
    }

    #[must_use]
    pub fn description_words(mut self, words: &str, mode: MatchMode) -> Self {
        words.clone_into(&mut self.description_words);
        self.description_match = mode;
        self
    }

    #[must_use]
    pub fn name_words(mut self, words: &str, mode: MatchMode) -> Self {
        words.clone_into(&mut self.name_words);
        self.name_match = mode;
        self
    }

    #[must_use]
    pub const fn include_libraries(mut self, include: bool) -> Self {
        self.include_libraries = include;
        self
    }

    #[must_use]
    pub const fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    pub fn section_filter(&self) -> &str {
        &self.section
    }

    pub fn description_filter(&self) -> (&str, MatchMode) {
        (&self.description_words, self.description_match)
    }

    pub fn name_filter(&self) -> (&str, MatchMode) {
        (&self.name_words, self.name_match)
    }

    pub const fn includes_libraries(&self) -> bool {
        self.include_libraries
    }

    pub const fn includes_docs(&self) -> bool {
        self.include_docs
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "section={} desc={:?}{} name={:?}{}",
            self.section,
            self.description_words,
            self.description_match,
            self.name_words,
            self.name_match
        )?;
        if self.include_libraries {
            f.write_str(" Lib")?;
        }
        if self.include_docs {
            f.write_str(" Doc")?;
        }
        Ok(())
    }
}

/// Name-based post-filters for library and documentation packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilters {
    pub libraries: LibraryFilter,
    pub doc_suffixes: Vec<String>,
}

impl Default for NameFilters {
    fn default() -> Self {
        Self {
            libraries: LibraryFilter::default(),
            doc_suffixes: vec!["-doc".to_string(), "-docs".to_string()],
        }
    }
}

impl NameFilters {
    pub fn is_docs(&self, name: &str) -> bool {
        self.doc_suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }

    fn keeps(&self, query: &Query, name: &str) -> bool {
        (query.include_libraries || !self.libraries.is_library(name))
            && (query.include_docs || !self.is_docs(name))
    }
}

/// Everything a query is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub indices: &'a Indices,
    pub tokenizer: &'a Tokenizer,
    pub filters: &'a NameFilters,
}

impl QueryContext<'_> {
    /// Evaluate `query` over `all_names`, returning the matching names.
    ///
    /// Each requested constraint (section, description words, name words) narrows the
    /// candidate set; unrequested constraints are skipped rather than treated as empty.
    pub fn evaluate<'n, I>(&self, query: &Query, all_names: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let mut constraints: Vec<AHashSet<&str>> = Vec::new();

        if !query.section.is_empty() {
            constraints.push(
                self.indices
                    .sections
                    .get(&query.section)
                    .map(|names| names.iter().map(String::as_str).collect())
                    .unwrap_or_default(),
            );
        }
        if !query.description_words.is_empty() {
            constraints.push(self.word_matches(
                &self.indices.descriptions,
                &query.description_words,
                query.description_match,
            ));
        }
        if !query.name_words.is_empty() {
            constraints.push(self.word_matches(
                &self.indices.names,
                &query.name_words,
                query.name_match,
            ));
        }

        // Check the smallest constraint first; most names fail there.
        constraints.sort_by_key(|set| set.len());

        let matches: BTreeSet<String> = all_names
            .into_iter()
            .filter(|name| constraints.iter().all(|set| set.contains(name)))
            .filter(|name| self.filters.keeps(query, name))
            .map(str::to_string)
            .collect();

        tracing::debug!("Query \"{}\" matched {} packages", query, matches.len());
        matches
    }

    /// Names matching the stemmed `words` in `index`.
    ///
    /// Tokens missing from the index are ignored, so an unknown word never empties an
    /// `All` match. If no token is known the result is empty in either mode.
    fn word_matches<'i>(
        &self,
        index: &'i StemmedIndex,
        words: &str,
        mode: MatchMode,
    ) -> AHashSet<&'i str> {
        let tokens = self.tokenizer.tokenize(words);
        let distinct: AHashSet<&str> = tokens.iter().map(String::as_str).collect();
        let mut sets: Vec<AHashSet<&str>> = distinct
            .iter()
            .filter_map(|token| index.get(token))
            .map(|names| names.iter().map(String::as_str).collect())
            .collect();

        if sets.len() < distinct.len() {
            tracing::debug!(
                "{} of {} query words are not indexed",
                distinct.len() - sets.len(),
                distinct.len()
            );
        }

        if mode == MatchMode::All && sets.len() > 1 {
            sets.sort_by_key(|set| set.len());
            let mut sets = sets.into_iter();
            let first = sets.next().unwrap_or_default();
            sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
        } else {
            sets.into_iter().flatten().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Corpus, Record};
    use assert2::check;
    use rstest::rstest;

    fn record(name: &str, section: &str, description: &str) -> Record {
        Record {
            name: name.to_string(),
            section: section.to_string(),
            description: description.to_string(),
            ..Record::default()
        }
    }

    struct Fixture {
        corpus: Corpus,
        indices: Indices,
        tokenizer: Tokenizer,
        filters: NameFilters,
    }

    impl Fixture {
        fn new(records: Vec<Record>) -> Self {
            let corpus = Corpus::from_batches([records]);
            let tokenizer = Tokenizer::default();
            let indices = Indices::build(&corpus, &tokenizer);
            Self {
                corpus,
                indices,
                tokenizer,
                filters: NameFilters::default(),
            }
        }

        fn run(&self, query: &Query) -> Vec<String> {
            let ctx = QueryContext {
                indices: &self.indices,
                tokenizer: &self.tokenizer,
                filters: &self.filters,
            };
            ctx.evaluate(query, self.corpus.names()).into_iter().collect()
        }
    }

    fn haskell() -> Fixture {
        Fixture::new(vec![
            record("hdevtools", "haskell", "Haskell background server daemon"),
            record("libghc-random-dev", "haskell", "Haskell random numbers generator"),
            record("haskell-doc", "doc", "Haskell documentation and tutorials"),
            record("libfoo-lib", "libs", "Haskell shared objects"),
            record("libreoffice-lib", "editors", "office suite shared objects"),
            record("bc", "math", "arbitrary precision calculator language"),
            record("python3-django", "python", "web framework"),
            record("python3-django-memoize", "python", "memoization for the web framework"),
        ])
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_query_returns_everything_but_libs_and_docs() {
        let fixture = haskell();
        let result = fixture.run(&Query::new());
        check!(
            result
                == names(&[
                    "bc",
                    "hdevtools",
                    "libghc-random-dev",
                    "libreoffice-lib",
                    "python3-django",
                    "python3-django-memoize",
                ])
        );

        let everything = fixture.run(&Query::new().include_libraries(true).include_docs(true));
        check!(everything.len() == fixture.corpus.len());
    }

    #[test]
    fn test_all_vs_any() {
        let fixture = haskell();
        let all = fixture.run(
            &Query::new()
                .description_words("haskell numbers", MatchMode::All)
                .include_libraries(true),
        );
        check!(all == names(&["libghc-random-dev"]));

        let any = fixture.run(
            &Query::new()
                .description_words("haskell numbers", MatchMode::Any)
                .include_libraries(true)
                .include_docs(true),
        );
        check!(any == names(&["haskell-doc", "hdevtools", "libfoo-lib", "libghc-random-dev"]));
    }

    #[rstest]
    #[case(MatchMode::All)]
    #[case(MatchMode::Any)]
    fn test_single_word_mode_irrelevant(#[case] mode: MatchMode) {
        let fixture = haskell();
        let result = fixture.run(&Query::new().description_words("daemon", mode));
        check!(result == names(&["hdevtools"]));
    }

    #[test]
    fn test_repeated_word_counts_once() {
        let fixture = haskell();
        let result = fixture.run(&Query::new().description_words("daemon daemons", MatchMode::All));
        check!(result == names(&["hdevtools"]));
    }

    #[test]
    fn test_section_constraint() {
        let fixture = haskell();
        check!(fixture.run(&Query::new().section("math")) == names(&["bc"]));
        check!(fixture.run(&Query::new().section("contrib/math")) == names(&["bc"]));
        check!(fixture.run(&Query::new().section("nonexistent")).is_empty());
    }

    #[test]
    fn test_section_and_names_intersect() {
        let fixture = haskell();
        let result = fixture.run(
            &Query::new()
                .section("python")
                .name_words("django memoize", MatchMode::All),
        );
        check!(result == names(&["python3-django-memoize"]));

        let any = fixture.run(
            &Query::new()
                .section("python")
                .name_words("django memoize", MatchMode::Any),
        );
        check!(any == names(&["python3-django", "python3-django-memoize"]));
    }

    #[test]
    fn test_name_words_ignore_descriptions() {
        let fixture = haskell();
        check!(fixture.run(&Query::new().name_words("web", MatchMode::All)).is_empty());
        check!(fixture.run(&Query::new().description_words("web", MatchMode::All)).len() == 2);
    }

    #[test]
    fn test_unknown_words_match_nothing() {
        let fixture = haskell();
        check!(fixture.run(&Query::new().name_words("zzzzzz", MatchMode::Any)).is_empty());
        check!(fixture.run(&Query::new().name_words("zzzzzz", MatchMode::All)).is_empty());
        check!(
            fixture
                .run(&Query::new().description_words("zzzzzz qqqqqq", MatchMode::All))
                .is_empty()
        );
    }

    #[rstest]
    #[case(MatchMode::All)]
    #[case(MatchMode::Any)]
    fn test_unknown_word_ignored_beside_known_ones(#[case] mode: MatchMode) {
        let fixture = haskell();
        let with_unknown =
            fixture.run(&Query::new().description_words("haskell daemon zzzzzz", mode));
        let without = fixture.run(&Query::new().description_words("haskell daemon", mode));
        check!(with_unknown == without);
        check!(with_unknown.iter().any(|name| name == "hdevtools"));
    }

    #[test]
    fn test_words_that_stem_to_nothing_match_nothing() {
        let fixture = haskell();
        check!(fixture.run(&Query::new().description_words("the of 42", MatchMode::Any)).is_empty());
    }

    #[test]
    fn test_foo_and_foobar_are_distinct_stems() {
        let fixture = Fixture::new(vec![record("foo", "misc", ""), record("foobar", "misc", "")]);
        let result = fixture.run(&Query::new().name_words("foo", MatchMode::All));
        check!(result == names(&["foo"]));
    }

    #[test]
    fn test_library_filter() {
        let fixture = haskell();
        let result = fixture.run(&Query::new().description_words("shared objects", MatchMode::All));
        check!(result == names(&["libreoffice-lib"]));

        let with_libs = fixture.run(
            &Query::new()
                .description_words("shared objects", MatchMode::All)
                .include_libraries(true),
        );
        check!(with_libs == names(&["libfoo-lib", "libreoffice-lib"]));
    }

    #[test]
    fn test_doc_filter() {
        let fixture = haskell();
        let query = Query::new().description_words("tutorials", MatchMode::All);
        check!(fixture.run(&query).is_empty());
        check!(fixture.run(&query.include_docs(true)) == names(&["haskell-doc"]));
    }

    #[test]
    fn test_adding_matching_words_never_removes_a_match() {
        let before = Fixture::new(vec![record("foo", "misc", "web server")]);
        let after = Fixture::new(vec![record("foo", "misc", "web server daemon")]);
        let query = Query::new().description_words("server daemon", MatchMode::All);
        check!(before.run(&query).is_empty());
        check!(after.run(&query) == names(&["foo"]));

        let query = Query::new().description_words("web", MatchMode::All);
        check!(before.run(&query) == after.run(&query));
    }

    #[test]
    fn test_display() {
        let query = Query::new()
            .section("admin/vcs")
            .name_words("git", MatchMode::Any)
            .include_docs(true);
        check!(query.to_string() == r#"section=vcs desc=""All name="git"Any Doc"#);
    }
}
