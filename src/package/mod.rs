//! Package metadata: records, the corpus, and the apt list file parsers.

pub mod control;
pub mod record;
pub mod translation;

pub use control::{ControlParser, ParseState, parse_packages, parse_packages_file};
pub use record::{Corpus, Record, normalize_section};
pub use translation::{Block, blocks, parse_translations, parse_translations_file};
