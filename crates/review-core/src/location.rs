//! Source location tracking for diagnostics.
//!
//! The compiler works line by line, so a location is a file name plus a
//! 1-based line number rather than a byte range.

use std::fmt;

/// A line in a named source file.
///
/// # Example
///
/// ```rust
/// use review_core::location::Location;
///
/// let loc = Location::new("intro.re", 12);
/// assert_eq!(loc.to_string(), "intro.re:12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// File name the line belongs to.
    pub file: String,
    /// 1-based line number; 0 means "before the first line".
    pub line: usize,
}

impl Location {
    /// Create a new location.
    #[inline]
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Same file, different line.
    #[inline]
    pub fn at_line(&self, line: usize) -> Self {
        Self {
            file: self.file.clone(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
