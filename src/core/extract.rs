//! Command extraction from model replies.
//!
//! A reply is cleaned (CRLF, BOM), fence-normalized, then scanned by six
//! independent passes, one per command kind. Each pass walks the header
//! lines that sit outside command bodies and validates what it finds on the
//! spot, so the first violation rejects the whole reply.
//!
//! Grammar (one reply may hold any number of blocks):
//!
//! ````text
//! ACCESS <path>
//! REPLACE <start>-<end> <path>
//! ```<tag>
//! <replacement lines>
//! ```
//! CREATE <path>
//! ```<tag>
//! <file lines>
//! ```
//! DELETE <path>
//! FOLLOWUP <text>
//! COMPLETE
//! ````

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::error::ParseError;
use crate::core::fence;
use crate::core::patch::{SourceReader, splice_lines};
use crate::core::protocol::{Action, Command, Keyword, ProjectSnapshot, normalize_path};
use crate::core::validate;

static ACCESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*ACCESS[ \t]+(\S.*?)\s*$").unwrap());
static REPLACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*REPLACE[ \t]+(\S+)[ \t]+(\S.*?)\s*$").unwrap());
static CREATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*CREATE[ \t]+(\S.*?)\s*$").unwrap());
static DELETE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*DELETE[ \t]+(\S.*?)\s*$").unwrap());
static FOLLOWUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*FOLLOWUP(?:[ \t]+(.*?))?\s*$").unwrap());
static COMPLETE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*COMPLETE\s*$").unwrap());

/// How extracted commands are ordered in the result.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CommandOrder {
    /// Grouped by kind (access, create, change, delete, followup, complete),
    /// reply order within a kind
    #[default]
    Kind,
    /// Reply order across all kinds
    Response,
}

/// Reply parser; cheap to build, holds no per-reply state.
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    order: CommandOrder,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: CommandOrder) -> Self {
        self.order = order;
        self
    }

    /// Extract every command in `reply`, validated against `snapshot`.
    ///
    /// `source` supplies current content for REPLACE targets.
    #[instrument(skip_all, fields(reply_len = reply.len(), files = snapshot.len()))]
    pub fn parse(
        &self,
        reply: &str,
        snapshot: &ProjectSnapshot,
        source: &dyn SourceReader,
    ) -> Result<Vec<Command>, ParseError> {
        let raw: Arc<str> = Arc::from(reply);
        let text = clean_input(reply);
        let normalized = fence::normalize(&text);
        let doc = Document::new(&normalized);

        let mut found: Vec<(usize, Command)> = Vec::new();
        found.extend(extract_access(&doc, snapshot, &raw)?);
        found.extend(extract_create(&doc, snapshot, &raw)?);
        found.extend(extract_change(&doc, snapshot, source, &raw)?);
        found.extend(extract_delete(&doc, snapshot, &raw)?);
        found.extend(extract_followup(&doc, &raw));
        found.extend(extract_complete(&doc, &raw));

        if found.is_empty() {
            return Err(ParseError::UnrecognizedFormat);
        }

        if self.order == CommandOrder::Response {
            found.sort_by_key(|(line, _)| *line);
        }

        debug!(commands = found.len(), order = ?self.order, "reply parsed");
        Ok(found.into_iter().map(|(_, cmd)| cmd).collect())
    }
}

/// Parse with default options.
pub fn parse_response(
    reply: &str,
    snapshot: &ProjectSnapshot,
    source: &dyn SourceReader,
) -> Result<Vec<Command>, ParseError> {
    ResponseParser::new().parse(reply, snapshot, source)
}

/// LF line endings, no leading BOM.
fn clean_input(reply: &str) -> String {
    reply.trim_start_matches('\u{FEFF}').replace("\r\n", "\n")
}

/// Normalized reply split into lines, with body lines marked.
struct Document<'a> {
    lines: Vec<&'a str>,
    /// True for OPEN/CLOSE lines and everything between them
    fenced: Vec<bool>,
}

impl<'a> Document<'a> {
    fn new(normalized: &'a str) -> Self {
        let lines: Vec<&str> = normalized.split('\n').collect();
        let mut fenced = vec![false; lines.len()];
        let mut inside = false;

        for (i, line) in lines.iter().enumerate() {
            if inside {
                fenced[i] = true;
                if fence::is_close(line) {
                    inside = false;
                }
            } else if fence::is_open(line) {
                fenced[i] = true;
                inside = true;
            }
        }

        Self { lines, fenced }
    }

    /// Header lines outside bodies that match `re`, with their line index.
    fn headers<'r>(&'r self, re: &'r Regex) -> impl Iterator<Item = (usize, Captures<'a>)> + 'r {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.fenced[*i])
            .filter_map(|(i, &line)| re.captures(line).map(|caps| (i, caps)))
    }

    /// Lines of the fenced block that follows `header` (blank lines allowed
    /// in between). The OPEN line with its tag and the CLOSE line are dropped;
    /// an empty block has no lines, a block holding one blank line has one.
    fn body_after(&self, header: usize) -> Option<Vec<&'a str>> {
        let len = self.lines.len();
        let mut i = header + 1;
        while i < len && !self.fenced[i] && self.lines[i].trim().is_empty() {
            i += 1;
        }
        if i >= len || !fence::is_open(self.lines[i]) {
            return None;
        }

        i += 1;
        let mut body: Vec<&'a str> = Vec::new();
        while i < len && !fence::is_close(self.lines[i]) {
            body.push(self.lines[i]);
            i += 1;
        }
        Some(body)
    }

    /// Free text from `first` through the line before the next command.
    fn text_until_next_command(&self, header: usize, first: &str) -> String {
        let mut parts: Vec<&str> = vec![first];
        for i in header + 1..self.lines.len() {
            let line = self.lines[i];
            if !self.fenced[i] && Keyword::leading(line).is_some() {
                break;
            }
            parts.push(line);
        }
        fence::restore(parts.join("\n").trim())
    }
}

fn capture<'t>(caps: &Captures<'t>, group: usize) -> &'t str {
    caps.get(group).map_or("", |m| m.as_str())
}

/// Path token as written, minus a leading `./` and stray backticks.
fn clean_path(token: &str) -> String {
    normalize_path(token.trim_matches('`')).to_string()
}

fn extract_access(
    doc: &Document<'_>,
    snapshot: &ProjectSnapshot,
    raw: &Arc<str>,
) -> Result<Vec<(usize, Command)>, ParseError> {
    let mut out = Vec::new();
    for (line, caps) in doc.headers(&ACCESS_RE) {
        let path = clean_path(capture(&caps, 1));
        validate::check_access(&path, snapshot)?;
        out.push((line, Command::new(Action::Access { path }, raw.clone())));
    }
    debug!(count = out.len(), "ACCESS");
    Ok(out)
}

fn extract_create(
    doc: &Document<'_>,
    snapshot: &ProjectSnapshot,
    raw: &Arc<str>,
) -> Result<Vec<(usize, Command)>, ParseError> {
    let mut out = Vec::new();
    for (line, caps) in doc.headers(&CREATE_RE) {
        let path = clean_path(capture(&caps, 1));
        validate::check_create(&path, snapshot)?;
        let content = doc
            .body_after(line)
            .ok_or_else(|| ParseError::NoCodeBlockFound {
                command: Keyword::Create,
                path: path.clone(),
            })?
            .join("\n");
        out.push((line, Command::new(Action::Create { path, content }, raw.clone())));
    }
    debug!(count = out.len(), "CREATE");
    Ok(out)
}

fn extract_change(
    doc: &Document<'_>,
    snapshot: &ProjectSnapshot,
    source: &dyn SourceReader,
    raw: &Arc<str>,
) -> Result<Vec<(usize, Command)>, ParseError> {
    let mut out = Vec::new();
    for (line, caps) in doc.headers(&REPLACE_RE) {
        let path = clean_path(capture(&caps, 2));
        let range = validate::check_replace(&path, capture(&caps, 1), snapshot)?;
        let body = doc
            .body_after(line)
            .ok_or_else(|| ParseError::NoCodeBlockFound {
                command: Keyword::Replace,
                path: path.clone(),
            })?;

        let original = source
            .read_source(&path)
            .map_err(|e| ParseError::SourceUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let content = splice_lines(&original, range, &body);
        let replacement = body.join("\n");

        out.push((
            line,
            Command::new(
                Action::Change {
                    path,
                    range,
                    replacement,
                    content,
                },
                raw.clone(),
            ),
        ));
    }
    debug!(count = out.len(), "REPLACE");
    Ok(out)
}

fn extract_delete(
    doc: &Document<'_>,
    snapshot: &ProjectSnapshot,
    raw: &Arc<str>,
) -> Result<Vec<(usize, Command)>, ParseError> {
    let mut out = Vec::new();
    for (line, caps) in doc.headers(&DELETE_RE) {
        let path = clean_path(capture(&caps, 1));
        validate::check_delete(&path, snapshot)?;
        out.push((line, Command::new(Action::Delete { path }, raw.clone())));
    }
    debug!(count = out.len(), "DELETE");
    Ok(out)
}

fn extract_followup(doc: &Document<'_>, raw: &Arc<str>) -> Vec<(usize, Command)> {
    let out: Vec<(usize, Command)> = doc
        .headers(&FOLLOWUP_RE)
        .filter_map(|(line, caps)| {
            let text = doc.text_until_next_command(line, capture(&caps, 1));
            if text.is_empty() {
                return None;
            }
            Some((line, Command::new(Action::Followup { text }, raw.clone())))
        })
        .collect();
    debug!(count = out.len(), "FOLLOWUP");
    out
}

fn extract_complete(doc: &Document<'_>, raw: &Arc<str>) -> Vec<(usize, Command)> {
    doc.headers(&COMPLETE_RE)
        .map(|(line, _)| (line, Command::new(Action::Complete, raw.clone())))
        .collect()
}
