//! Line-range splicing for REPLACE commands.
//!
//! `content = lines[..start] ++ replacement ++ lines[end + 1..]`
//!
//! Lines are the original split on `\n`, so a trailing newline yields a
//! final empty line that can be addressed like any other (it is numbered in
//! the view the model reads). Both bounds are clamped to the line count:
//! a range starting at or past the last line appends, and an `end` past the
//! last line runs through end of file. A replacement with no lines removes
//! the range; `[""]` leaves one blank line in its place. CRLF files keep CRLF.

use std::io;

use crate::core::protocol::LineRange;

/// Where the patcher gets a file's current content from.
pub trait SourceReader {
    /// Full text of the project-relative `path`.
    fn read_source(&self, path: &str) -> io::Result<String>;
}

impl SourceReader for std::collections::BTreeMap<String, String> {
    fn read_source(&self, path: &str) -> io::Result<String> {
        self.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{path} not loaded"))
        })
    }
}

impl SourceReader for std::collections::HashMap<String, String> {
    fn read_source(&self, path: &str) -> io::Result<String> {
        self.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{path} not loaded"))
        })
    }
}

/// Replace the inclusive `range` of `original` with the `replacement` lines.
pub fn splice_lines<S: AsRef<str>>(original: &str, range: LineRange, replacement: &[S]) -> String {
    let nl = detect_newline(original);

    let lines: Vec<&str> = split_lines(original);
    let start = range.start.min(lines.len());
    let end = range.end.saturating_add(1).min(lines.len()).max(start);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + replacement.len());
    out.extend_from_slice(&lines[..start]);
    out.extend(replacement.iter().map(|l| {
        let l = l.as_ref();
        l.strip_suffix('\r').unwrap_or(l)
    }));
    out.extend_from_slice(&lines[end..]);

    out.join(nl)
}

/// Split on `\n`, dropping a `\r` that precedes it.
fn split_lines(s: &str) -> Vec<&str> {
    s.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Newline style of the first line break; LF when there is none.
fn detect_newline(s: &str) -> &'static str {
    match memchr::memchr(b'\n', s.as_bytes()) {
        Some(pos) if pos > 0 && s.as_bytes()[pos - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

/// Number of addressable lines in `content` under the splice rules.
pub fn line_count(content: &str) -> usize {
    memchr::memchr_iter(b'\n', content.as_bytes()).count() + 1
}
