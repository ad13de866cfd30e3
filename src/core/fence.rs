//! Fence normalization for model replies.
//!
//! Replies wrap command bodies in triple backticks, but a body may itself
//! contain fenced examples (a README documenting a shell command, say).
//! This pass rewrites only the delimiters of command bodies into private-use
//! sentinels so the extractor never has to guess which marker is which:
//!
//! - an opening marker becomes `OPEN` followed by its optional language tag
//! - the marker right before the next command keyword (or end of text) becomes `CLOSE`
//! - any other marker inside a body is left alone as content
//! - a body still open at end of text gets a synthetic `CLOSE`

use crate::core::protocol::Keyword;

/// Sentinel replacing a body's opening fence.
pub const OPEN: char = '\u{E000}';

/// Sentinel replacing a body's closing fence.
pub const CLOSE: char = '\u{E001}';

const FENCE: &str = "```";

/// Rewrite body fences into `OPEN`/`CLOSE` sentinel lines.
///
/// Expects LF line endings; stray `\r` before a newline is tolerated.
pub fn normalize(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 1);
    let mut in_fence = false;

    for (i, line) in lines.iter().enumerate() {
        let t = line.trim();

        if !t.starts_with(FENCE) {
            out.push((*line).to_string());
            continue;
        }

        if !in_fence {
            in_fence = true;
            let tag = t[FENCE.len()..].trim();
            out.push(format!("{OPEN}{tag}"));
            continue;
        }

        if closes_body(&lines[i + 1..]) {
            in_fence = false;
            // A nested fence glued to the real close (six backticks) keeps its
            // leading part as content.
            let prefix = t.strip_suffix(FENCE).unwrap_or_default();
            if !prefix.trim().is_empty() {
                out.push(prefix.to_string());
            }
            out.push(CLOSE.to_string());
        } else {
            out.push((*line).to_string());
        }
    }

    if in_fence {
        // Keep a trailing newline after the synthetic close
        let at = match out.last() {
            Some(last) if last.is_empty() => out.len() - 1,
            _ => out.len(),
        };
        out.insert(at, CLOSE.to_string());
    }

    out.join("\n")
}

/// A fence inside a body is the real close when the next non-blank line
/// starts a command or nothing but blank lines follow.
fn closes_body(rest: &[&str]) -> bool {
    match rest.iter().find(|l| !l.trim().is_empty()) {
        None => true,
        Some(next) => Keyword::leading(next).is_some(),
    }
}

/// Render sentinels back as plain fences (for free text that spans a body).
pub fn restore(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            OPEN | CLOSE => out.push_str(FENCE),
            _ => out.push(c),
        }
    }
    out
}

/// True when `line` is an `OPEN` sentinel line.
pub fn is_open(line: &str) -> bool {
    line.starts_with(OPEN)
}

/// True when `line` is a `CLOSE` sentinel line.
pub fn is_close(line: &str) -> bool {
    line.starts_with(CLOSE)
}
