//! Streaming parser for Debian control-file stanzas (apt `Packages` files).
//!
//! Each line drives an explicit [`ParseState`] transition. A blank line closes the
//! current stanza; malformed lines are dropped without aborting the parse.

use super::record::{Record, normalize_section};
use crate::error::SourceReadError;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Keys whose value (and indented continuation lines) form the description.
const DESCRIPTION_KEYS: &[&str] = &["Description", "Npp-Description"];

/// Where the parser is relative to multi-line field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseState {
    /// Expecting a `Key: value` line or a blank line
    #[default]
    Idle,
    /// Indented lines extend the current description
    InDescription,
    /// Indented lines belong to some other field and are skipped
    InContinuation,
}

/// Line-at-a-time stanza parser.
#[derive(Debug, Default)]
pub struct ControlParser {
    state: ParseState,
    current: Record,
    records: Vec<Record>,
    line_no: usize,
}

impl ControlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Feed one line (with or without its trailing newline).
    pub fn feed_line(&mut self, line: &str) {
        self.line_no += 1;
        let line = line.trim_end_matches(['\n', '\r']);

        if line.trim().is_empty() {
            self.finish_stanza();
            self.state = ParseState::Idle;
            return;
        }

        if line.starts_with([' ', '\t']) {
            self.state = match self.state {
                ParseState::InDescription => {
                    self.extend_description(line.trim());
                    ParseState::InDescription
                }
                ParseState::Idle | ParseState::InContinuation => ParseState::InContinuation,
            };
            return;
        }

        self.state = match split_key_value(line) {
            Some((key, value)) => self.apply(key, value),
            None => {
                tracing::trace!("line {}: not a `Key: value` line, skipping", self.line_no);
                ParseState::InContinuation
            }
        };
    }

    /// Close any open stanza and return every record parsed so far.
    pub fn finish(mut self) -> Vec<Record> {
        self.finish_stanza();
        self.records
    }

    fn apply(&mut self, key: &str, value: &str) -> ParseState {
        match key {
            "Package" => value.clone_into(&mut self.current.name),
            "Version" => value.clone_into(&mut self.current.version),
            "Section" => self.current.section = normalize_section(value),
            "Homepage" => value.clone_into(&mut self.current.url),
            "Installed-Size" => {
                self.current.size = value.parse().unwrap_or_else(|_| {
                    tracing::trace!(
                        "line {}: malformed Installed-Size {:?}, using 0",
                        self.line_no,
                        value
                    );
                    0
                });
            }
            key if DESCRIPTION_KEYS.contains(&key) => {
                if !self.current.description.is_empty() {
                    self.current.description.push('\n');
                }
                self.current.description.push_str(value);
                return ParseState::InDescription;
            }
            _ => {}
        }
        ParseState::Idle
    }

    /// Append a continuation line; a lone `.` marks a paragraph break.
    fn extend_description(&mut self, text: &str) {
        self.current.description.push('\n');
        if text != "." {
            self.current.description.push_str(text);
        }
    }

    fn finish_stanza(&mut self) {
        let record = std::mem::take(&mut self.current);
        if record.is_valid() {
            self.records.push(record);
        }
    }
}

/// Split `Key: value` at the first colon. Keys never contain whitespace.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value.trim()))
}

/// Parse every stanza from a reader. Invalid UTF-8 is replaced rather than rejected.
pub fn parse_packages<R: BufRead>(mut reader: R) -> io::Result<Vec<Record>> {
    let mut parser = ControlParser::new();
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

/// Parse a Packages file from disk.
pub fn parse_packages_file(path: &Path) -> Result<Vec<Record>, SourceReadError> {
    let to_error = |source| SourceReadError {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(to_error)?;
    parse_packages(BufReader::new(file)).map_err(to_error)
}
