use std::fmt;

use thiserror::Error;

use crate::location::Location;
use crate::syntax::Arity;

/// How serious a diagnostic is.
///
/// Neither severity stops compilation; an error means the output contains a
/// fallback rendering for the construct that was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Malformed but harmless input (a stray `//`, a skipped block).
    Warning,
    /// A construct that could not be compiled as written.
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning or error reported while compiling a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable message.
    pub message: String,
    /// Where the offending construct was seen.
    pub location: Location,
    /// Warning or error.
    pub severity: Severity,
}

impl Diagnostic {
    /// Create a diagnostic with an explicit severity.
    pub fn new(severity: Severity, message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
            severity,
        }
    }

    /// Create a warning.
    pub fn warning(message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Warning, message, location)
    }

    /// Create an error.
    pub fn error(message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Error, message, location)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Diagnostics collected during one compile run, in the order reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a diagnostic to the collection.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over every diagnostic.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Iterate over error-severity diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    /// Iterate over warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| !d.is_error())
    }

    /// Check if any error-severity diagnostic was reported.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Returned by [`Compiler::compile_strict`](crate::Compiler::compile_strict)
/// when a chapter compiled with errors.
#[derive(Debug, Clone, Error)]
#[error("{first} ({count} error(s) in total)")]
pub struct CompileError {
    /// The first error reported.
    pub first: Diagnostic,
    /// Number of error-severity diagnostics.
    pub count: usize,
    /// Everything reported during the run, warnings included.
    pub diagnostics: Diagnostics,
}

/// Problems with a command's bracketed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// `[a][b` and other text that is not a run of `[...]` groups.
    #[error("argument syntax error: {0:?}")]
    MalformedArguments(String),
    /// Argument count outside the command's arity.
    #[error("wrong # of parameters (block command //{name}, expect {expected} but {given})")]
    WrongArity {
        name: String,
        expected: Arity,
        given: usize,
    },
    /// A command-specific validator rejected the arguments.
    #[error("invalid parameter for //{name}: {reason}")]
    InvalidArgument { name: String, reason: String },
}

/// Failure to resolve a single `@<op>{...}` span.
///
/// Scoped to one span: the caller reports it and renders the span as text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InlineError {
    #[error("no such inline op: {0}")]
    UnknownOp(String),
    #[error("strategy does not support inline op: @<{0}>")]
    Unsupported(String),
    /// The strategy supports the op but could not render this argument.
    #[error("{0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::error("unknown command: //foo", Location::new("ch01.re", 7));
        assert_eq!(d.to_string(), "ch01.re:7: error: unknown command: //foo");
    }

    #[test]
    fn test_diagnostics_partition() {
        let mut all = Diagnostics::new();
        all.push(Diagnostic::warning("w", Location::default()));
        all.push(Diagnostic::error("e1", Location::default()));
        all.push(Diagnostic::error("e2", Location::default()));

        assert_eq!(all.len(), 3);
        assert_eq!(all.error_count(), 2);
        assert_eq!(all.warnings().count(), 1);
        assert!(all.has_errors());
    }

    #[test]
    fn test_syntax_error_messages() {
        let err = SyntaxError::WrongArity {
            name: "table".to_string(),
            expected: Arity::Range(0, 3),
            given: 5,
        };
        assert_eq!(
            err.to_string(),
            "wrong # of parameters (block command //table, expect 0..3 but 5)"
        );

        let err = SyntaxError::MalformedArguments("[a][b".to_string());
        assert_eq!(err.to_string(), r#"argument syntax error: "[a][b""#);
    }
}
