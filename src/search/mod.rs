//! Stemmed keyword search over package names, descriptions and sections.
//!
//! This module provides tokenization, the inverted indices, and set-algebra query
//! evaluation. There is no ranking: a query yields an unordered set of names.

// Module declarations
pub mod index;
pub mod query;
pub mod tokenize;

pub use index::{Indices, StemmedIndex};
pub use query::{MatchMode, NameFilters, Query, QueryContext};
pub use tokenize::Tokenizer;
