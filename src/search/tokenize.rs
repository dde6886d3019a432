//! Text tokenization and stemming for package names and descriptions.

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::sync::LazyLock;

/// Stems that occur in so many package descriptions that they carry no signal.
/// Compared after stemming, so "libraries" and "library" are both caught by "librari".
pub(crate) const STOP_STEMS: &[&str] = &[
    "and", "applic", "bit", "compil", "data", "debug", "develop", "document", "file", "for",
    "gnu", "in", "kernel", "librari", "linux", "modul", "of", "on", "packag", "runtim",
    "support", "the", "to", "tool", "version", "with",
];

/// Snowball reaches a fixed point within a few passes; this only bounds the loop.
const MAX_STEM_PASSES: usize = 4;

/// Tokens starting with this prefix are dropped; nearly every shared library matches it.
const LIBRARY_PREFIX: &str = "lib";

static NON_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\P{L}+").expect("non-letter pattern is valid"));

/// Turns free text into stemmed, filtered word tokens.
///
/// Holds the stemmer so a single instance can be reused for a whole index build.
pub struct Tokenizer {
    stemmer: Stemmer,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer").finish_non_exhaustive()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Algorithm::English)
    }
}

impl Tokenizer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            stemmer: Stemmer::create(algorithm),
        }
    }

    /// Splits `text` on non-letters, case-folds, stems, and drops noise tokens.
    ///
    /// Tokens come out in input order with duplicates kept; callers put them in sets.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let letters_only = NON_LETTERS.replace_all(text, " ");
        case_fold(&letters_only)
            .split_whitespace()
            .map(|word| self.stem(word))
            .filter(|stem| keep_token(stem))
            .collect()
    }

    /// Stem repeatedly until the word stops changing, so stems are stable under
    /// re-tokenization ("agreed" -> "agre" -> "agr").
    fn stem(&self, word: &str) -> String {
        let mut current = word.to_string();
        for _ in 0..MAX_STEM_PASSES {
            let next = self.stemmer.stem(&current);
            if next == current {
                break;
            }
            current = next.into_owned();
        }
        current
    }
}

/// Full Unicode case folding: lowercase, then expand the characters whose folded
/// form differs from their lowercase form.
fn case_fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match c {
            'ß' => folded.push_str("ss"),
            'ſ' => folded.push('s'),
            'ς' => folded.push('σ'),
            'ﬀ' => folded.push_str("ff"),
            'ﬁ' => folded.push_str("fi"),
            'ﬂ' => folded.push_str("fl"),
            'ﬃ' => folded.push_str("ffi"),
            'ﬄ' => folded.push_str("ffl"),
            'ﬅ' | 'ﬆ' => folded.push_str("st"),
            c => folded.push(c),
        }
    }
    folded
}

fn keep_token(stem: &str) -> bool {
    stem.chars().nth(1).is_some()
        && !stem.chars().all(|c| c.is_ascii_digit())
        && !stem.starts_with(LIBRARY_PREFIX)
        && !STOP_STEMS.contains(&stem)
}
