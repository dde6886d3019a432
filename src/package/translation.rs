//! Parser for apt `i18n/Translation-*` files, which carry long descriptions.
//!
//! Bullet lists in the source text are turned into explicit markers so the structure
//! survives indexing and caching:
//!
//! - [`LIST_START`] on its own line opens a list,
//! - each item is a line starting with [`ITEM_PREFIX`],
//! - [`LIST_END`] on its own line closes it.
//!
//! Paragraphs are separated by a blank line. [`blocks`] decodes the result.

use crate::error::SourceReadError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

pub const LIST_START: &str = "\u{b}+";
pub const LIST_END: &str = "\u{b}-";
pub const ITEM_PREFIX: char = '\t';

static DESCRIPTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Description(?:-[\w@]+)?:\s*").expect("description header pattern is valid")
});

/// Accumulates one translated description.
#[derive(Debug, Default)]
struct DescriptionBuilder {
    text: String,
    in_list: bool,
    /// The previous line was a list item, so deeper-indented lines continue it
    after_item: bool,
}

impl DescriptionBuilder {
    fn start(summary: &str) -> Self {
        Self {
            text: summary.trim().to_string(),
            ..Self::default()
        }
    }

    fn push_line(&mut self, raw: &str) {
        let body = raw.trim_start();
        let indent = raw.len() - body.len();
        let body = body.trim_end();

        if body == "." {
            self.close_list();
            self.text.push_str("\n\n");
            self.after_item = false;
        } else if let Some(item) = body.strip_prefix("* ").or_else(|| body.strip_prefix("- ")) {
            if !self.in_list {
                self.new_line();
                self.text.push_str(LIST_START);
                self.in_list = true;
            }
            self.text.push('\n');
            self.text.push(ITEM_PREFIX);
            self.text.push_str(item.trim());
            self.after_item = true;
        } else if self.in_list && self.after_item && indent > 1 {
            self.text.push(' ');
            self.text.push_str(body);
        } else {
            self.close_list();
            self.after_item = false;
            if self.text.is_empty() || self.text.ends_with('\n') {
                self.text.push_str(body);
            } else {
                // The summary line stands alone; body text joins with a space.
                let separator = if self.text.contains('\n') { ' ' } else { '\n' };
                self.text.push(separator);
                self.text.push_str(body);
            }
        }
    }

    fn close_list(&mut self) {
        if self.in_list {
            self.text.push('\n');
            self.text.push_str(LIST_END);
            self.text.push('\n');
            self.in_list = false;
        }
    }

    fn new_line(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    fn finish(mut self) -> String {
        self.close_list();
        // Plain `trim` would also eat the vertical tab of a leading list marker.
        self.text.trim_matches(['\n', ' ']).to_string()
    }
}

/// Line-at-a-time Translation parser.
#[derive(Debug, Default)]
pub struct TranslationParser {
    name: Option<String>,
    description: Option<DescriptionBuilder>,
    descriptions: BTreeMap<String, String>,
}

impl TranslationParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.trim().is_empty() {
            self.finish_entry();
            return;
        }

        if let Some(name) = line.strip_prefix("Package:") {
            self.finish_entry();
            self.name = Some(name.trim().to_string());
            return;
        }

        if self.name.is_none() || line.starts_with("Description-md5") {
            return;
        }

        if let Some(header) = DESCRIPTION_HEADER.find(line) {
            self.description = Some(DescriptionBuilder::start(&line[header.end()..]));
        } else if let Some(description) = self.description.as_mut()
            && line.starts_with([' ', '\t'])
        {
            description.push_line(line);
        }
    }

    pub fn finish(mut self) -> BTreeMap<String, String> {
        self.finish_entry();
        self.descriptions
    }

    fn finish_entry(&mut self) {
        let name = self.name.take();
        let description = self.description.take();
        if let (Some(name), Some(description)) = (name, description)
            && !name.is_empty()
        {
            self.descriptions
                .entry(name)
                .or_insert_with(|| description.finish());
        }
    }
}

/// Parse every entry from a reader into `name -> description`.
pub fn parse_translations<R: BufRead>(mut reader: R) -> io::Result<BTreeMap<String, String>> {
    let mut parser = TranslationParser::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        parser.feed_line(&String::from_utf8_lossy(&buf));
    }
    Ok(parser.finish())
}

/// Parse a Translation file from disk.
pub fn parse_translations_file(path: &Path) -> Result<BTreeMap<String, String>, SourceReadError> {
    let to_error = |source| SourceReadError {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(to_error)?;
    parse_translations(BufReader::new(file)).map_err(to_error)
}

/// A structural piece of a description, as decoded from the list markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    List(Vec<String>),
}

/// Decode a description into paragraphs and lists.
///
/// Plain descriptions (no markers) come back as paragraphs split on blank lines.
pub fn blocks(description: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Option<Vec<String>> = None;

    let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };

    for line in description.lines() {
        if line == LIST_START {
            flush(&mut paragraph, &mut blocks);
            list = Some(Vec::new());
        } else if line == LIST_END {
            if let Some(items) = list.take() {
                blocks.push(Block::List(items));
            }
        } else if let Some(items) = list.as_mut() {
            if let Some(item) = line.strip_prefix(ITEM_PREFIX) {
                items.push(item.to_string());
            }
        } else if line.trim().is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else {
            paragraph.push(line.trim());
        }
    }
    flush(&mut paragraph, &mut blocks);
    if let Some(items) = list {
        blocks.push(Block::List(items));
    }
    blocks
}
