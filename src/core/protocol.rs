//! Command protocol types shared by the normalizer, extractor and apply loop.
//!
//! - `Keyword` is the closed set of command keywords
//! - `Command` pairs a typed `Action` with the reply it came from
//! - `ProjectSnapshot` is the frozen file listing validation runs against

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::error::ParseError;

/// The six command keywords, in the order the extractor groups them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Keyword {
    Access,
    Create,
    Replace,
    Delete,
    Followup,
    Complete,
}

impl Keyword {
    /// Every keyword; the fence lookahead and the extractor both read this list.
    pub const ALL: [Keyword; 6] = [
        Keyword::Access,
        Keyword::Create,
        Keyword::Replace,
        Keyword::Delete,
        Keyword::Followup,
        Keyword::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Access => "ACCESS",
            Keyword::Create => "CREATE",
            Keyword::Replace => "REPLACE",
            Keyword::Delete => "DELETE",
            Keyword::Followup => "FOLLOWUP",
            Keyword::Complete => "COMPLETE",
        }
    }

    /// Keyword a line opens with, ignoring leading whitespace.
    pub fn leading(line: &str) -> Option<Keyword> {
        let t = line.trim_start();
        Keyword::ALL
            .into_iter()
            .find(|kw| t.starts_with(kw.as_str()))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive 0-based line span of a REPLACE command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Parse a `start-end` span token.
    pub fn parse(span: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidRange {
            span: span.to_string(),
        };

        let (start, end) = span.split_once('-').ok_or_else(invalid)?;
        let start = parse_bound(start).ok_or_else(invalid)?;
        let end = parse_bound(end).ok_or_else(invalid)?;

        if start > end {
            return Err(invalid());
        }

        Ok(Self { start, end })
    }
}

/// ASCII digits only; `usize::from_str` alone would take a leading `+`.
fn parse_bound(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// What a command asks the caller to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Access {
        path: String,
    },
    Change {
        path: String,
        range: LineRange,
        /// Body of the REPLACE block
        replacement: String,
        /// Full file content after the splice
        content: String,
    },
    Create {
        path: String,
        content: String,
    },
    Delete {
        path: String,
    },
    #[serde(rename = "follow-up")]
    Followup {
        text: String,
    },
    Complete,
}

impl Action {
    pub fn keyword(&self) -> Keyword {
        match self {
            Action::Access { .. } => Keyword::Access,
            Action::Change { .. } => Keyword::Replace,
            Action::Create { .. } => Keyword::Create,
            Action::Delete { .. } => Keyword::Delete,
            Action::Followup { .. } => Keyword::Followup,
            Action::Complete => Keyword::Complete,
        }
    }

    /// Target path, for the kinds that have one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Action::Access { path }
            | Action::Change { path, .. }
            | Action::Create { path, .. }
            | Action::Delete { path } => Some(path),
            Action::Followup { .. } | Action::Complete => None,
        }
    }
}

/// One extracted command plus the verbatim reply it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    #[serde(flatten)]
    pub action: Action,
    #[serde(skip_serializing)]
    pub raw: Arc<str>,
}

impl Command {
    pub fn new(action: Action, raw: Arc<str>) -> Self {
        Self { action, raw }
    }
}

/// Point-in-time set of project-relative file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectSnapshot {
    files: BTreeSet<String>,
}

impl ProjectSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(normalize_path(path))
    }

    pub fn insert(&mut self, path: impl AsRef<str>) {
        self.files.insert(normalize_path(path.as_ref()).to_string());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProjectSnapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut snapshot = ProjectSnapshot::new();
        for p in iter {
            snapshot.insert(p);
        }
        snapshot
    }
}

/// Strip leading `./` segments so `./a.txt` and `a.txt` compare equal.
pub fn normalize_path(path: &str) -> &str {
    let mut p = path.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p
}
