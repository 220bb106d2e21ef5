// src/progress.rs

//! Progress line protocol.
//!
//! Supervised tasks report completion by printing lines such as
//! `PROGRESS 40`. The token is case-insensitive, surrounding whitespace is
//! allowed and the value (one to three digits) is clamped to `0..=100`.
//! Anything else on the line means it is not a progress line.

use std::sync::LazyLock;

use regex::Regex;

static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*PROGRESS[ \t]+([0-9]{1,3})\s*$").expect("progress pattern is valid")
});

/// Parse a single line of task output.
///
/// Returns the clamped percentage when the line follows the protocol.
pub fn parse_progress_line(line: &str) -> Option<u8> {
    let caps = PROGRESS_LINE.captures(line)?;
    let value: u16 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}

/// Splits an arbitrarily chunked byte stream into complete lines.
///
/// Bytes after the last newline are held back until the next chunk (or
/// [`LineBuffer::finish`]) completes them, so a line split across reads is
/// only ever seen once.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// trailing `\n` / `\r\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            trim_newline(&mut line);
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush an unterminated last line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.pending);
        trim_newline(&mut line);
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn trim_newline(line: &mut Vec<u8>) {
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_progress_lines() {
        assert_eq!(parse_progress_line("PROGRESS 0"), Some(0));
        assert_eq!(parse_progress_line("PROGRESS 42"), Some(42));
        assert_eq!(parse_progress_line("progress 57"), Some(57));
        assert_eq!(parse_progress_line("Progress 100"), Some(100));
        assert_eq!(parse_progress_line("  PROGRESS   7  "), Some(7));
        assert_eq!(parse_progress_line("PROGRESS\t9"), Some(9));
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(parse_progress_line("PROGRESS 250"), Some(100));
        assert_eq!(parse_progress_line("PROGRESS 999"), Some(100));
        assert_eq!(parse_progress_line("PROGRESS 101"), Some(100));
    }

    #[test]
    fn rejects_everything_else() {
        for line in [
            "PROGRESS",
            "PROGRESS ",
            "xPROGRESS 10",
            "PROGRESS 10%",
            "PROGRESS 1000",
            "PROGRESS10",
            "PROGRESS -5",
            "PROGRESS 5 done",
            "[info] PROGRESS 5",
            "PROGRESS ٣",
            "",
        ] {
            assert_eq!(parse_progress_line(line), None, "{line:?}");
        }
    }

    #[test]
    fn line_buffer_holds_partial_lines() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"PROG").is_empty());
        assert!(buf.has_partial());
        assert_eq!(buf.push(b"RESS 42\n"), vec!["PROGRESS 42"]);
        assert!(!buf.has_partial());
    }

    #[test]
    fn line_buffer_splits_multiple_lines_and_strips_crlf() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\r\nb\n\nc"), vec!["a", "b", ""]);
        assert_eq!(buf.finish().as_deref(), Some("c"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn line_buffer_decodes_utf8_split_across_chunks() {
        let text = "größe\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert!(buf.push(&text[..3]).is_empty());
        assert_eq!(buf.push(&text[3..]), vec!["größe"]);
    }
}
