//! Line scanner with lookahead.
//!
//! The compiler pulls one line at a time and decides what to do from the
//! next unconsumed line, so the scanner only ever moves forward. Newlines are
//! located with `memchr`, lines borrow from the input, and lines beginning
//! with `#@` (preprocessor comments) are dropped while still counting toward
//! line numbers.

use memchr::memchr;

/// Prefix of a preprocessor comment line.
const COMMENT_PREFIX: &str = "#@";

/// Strip ASCII whitespace from both ends; U+3000 and other Unicode spaces
/// are text.
#[inline]
pub fn strip(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_whitespace())
}

/// Strip trailing ASCII whitespace.
#[inline]
pub fn strip_end(s: &str) -> &str {
    s.trim_end_matches(|c: char| c.is_ascii_whitespace())
}

/// A single line from the input with its 1-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line text (without trailing newline).
    pub text: &'a str,
    /// 1-based line number in the source.
    pub number: usize,
}

impl<'a> Line<'a> {
    /// Check if this line contains only whitespace.
    #[inline(always)]
    pub fn is_blank(&self) -> bool {
        strip(self.text).is_empty()
    }

    #[inline(always)]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.text.starts_with(prefix)
    }

    #[inline(always)]
    pub fn trimmed(&self) -> &'a str {
        strip(self.text)
    }
}

/// Forward-only cursor over the lines of a chapter.
pub struct LineScanner<'a> {
    input: &'a str,
    /// Byte offset of the next unread line.
    offset: usize,
    /// Number of raw lines read so far, comments included.
    read: usize,
    /// Number of the last line handed out by `next_line`.
    lineno: usize,
    peeked: Option<Line<'a>>,
}

impl<'a> LineScanner<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            read: 0,
            lineno: 0,
            peeked: None,
        }
    }

    /// Line number of the most recently consumed line (0 before the first).
    #[inline(always)]
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Check if all input has been consumed.
    #[inline]
    pub fn is_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Look at the next line without consuming it.
    #[inline]
    pub fn peek(&mut self) -> Option<Line<'a>> {
        if self.peeked.is_none() {
            self.peeked = self.read_line();
        }
        self.peeked
    }

    /// Consume and return the next line.
    #[inline]
    pub fn next_line(&mut self) -> Option<Line<'a>> {
        let line = match self.peeked.take() {
            Some(line) => Some(line),
            None => self.read_line(),
        }?;
        self.lineno = line.number;
        Some(line)
    }

    /// Consume the next line only if it satisfies `pred`.
    pub fn next_if(&mut self, pred: impl FnOnce(&Line<'a>) -> bool) -> Option<Line<'a>> {
        match self.peek() {
            Some(line) if pred(&line) => self.next_line(),
            _ => None,
        }
    }

    /// Consume lines while `pred` holds.
    pub fn scan_while(&mut self, mut pred: impl FnMut(&Line<'a>) -> bool) -> Vec<Line<'a>> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_if(&mut pred) {
            lines.push(line);
        }
        lines
    }

    /// Consume lines up to, but not including, the first one matching `pred`.
    ///
    /// Stops at end of input if no line matches.
    pub fn scan_until(&mut self, mut pred: impl FnMut(&Line<'a>) -> bool) -> Vec<Line<'a>> {
        self.scan_while(|line| !pred(line))
    }

    /// Skip blank lines and return the count skipped.
    #[inline]
    pub fn skip_blank_lines(&mut self) -> usize {
        self.scan_while(|line| line.is_blank()).len()
    }

    fn read_line(&mut self) -> Option<Line<'a>> {
        loop {
            let line = self.read_raw_line()?;
            if !line.starts_with(COMMENT_PREFIX) {
                return Some(line);
            }
        }
    }

    fn read_raw_line(&mut self) -> Option<Line<'a>> {
        let bytes = self.input.as_bytes();
        if self.offset >= bytes.len() {
            return None;
        }

        let start = self.offset;
        let end = match memchr(b'\n', &bytes[start..]) {
            Some(pos) => start + pos,
            None => bytes.len(),
        };
        let text_end = if end > start && bytes[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };

        self.offset = if end < bytes.len() { end + 1 } else { end };
        self.read += 1;

        // '\n' and '\r' are ASCII, so both ends are char boundaries.
        Some(Line {
            text: &self.input[start..text_end],
            number: self.read,
        })
    }
}
