//! Command vocabulary: block commands, single-line commands, inline ops.
//!
//! The standard registry is built once per process and shared read-only.
//! Block/single commands and inline ops live in separate namespaces, so
//! `list` can be both `//list[...]{` and `@<list>{...}`.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::SyntaxError;
use crate::scanner::{strip, strip_end};

/// Argument substituted for every missing or rejected argument.
pub const PLACEHOLDER_ARG: &str = "(NoArgument)";

/// Commands whose body lines are passed through untouched.
pub const PREFORMATTED: &[&str] = &["emlist", "list", "emlistnum", "listnum", "cmd"];

/// Accepted number of bracketed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Exact(usize),
    /// Inclusive on both ends.
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    #[inline]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }

    #[inline]
    pub fn min(self) -> usize {
        match self {
            Arity::Exact(n) | Arity::Range(n, _) | Arity::AtLeast(n) => n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Range(lo, hi) => write!(f, "{lo}..{hi}"),
            Arity::AtLeast(n) => write!(f, "{n}.."),
        }
    }
}

/// Whether a command takes a `{ ... //}` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockPolicy {
    /// Block command; a missing body is an error.
    Required,
    /// Block command; the body may be omitted.
    Optional,
    /// Single-line command; a supplied body is an error.
    Disallowed,
}

impl BlockPolicy {
    #[inline]
    pub fn allows_block(self) -> bool {
        !matches!(self, BlockPolicy::Disallowed)
    }
}

/// Extra argument check run after the arity check.
pub type Validator = fn(&[String]) -> Result<(), String>;

/// A registered block or single-line command.
#[derive(Debug, Clone)]
pub struct SyntaxDescriptor {
    pub name: String,
    pub arity: Arity,
    pub block_policy: BlockPolicy,
    pub validator: Option<Validator>,
}

impl SyntaxDescriptor {
    #[inline]
    pub fn is_block(&self) -> bool {
        self.block_policy.allows_block()
    }

    #[inline]
    pub fn is_preformatted(&self) -> bool {
        PREFORMATTED.contains(&self.name.as_str())
    }

    /// Check argument count, then the validator if any.
    pub fn check_args(&self, args: &[String]) -> Result<(), SyntaxError> {
        if !self.arity.accepts(args.len()) {
            return Err(SyntaxError::WrongArity {
                name: self.name.clone(),
                expected: self.arity,
                given: args.len(),
            });
        }
        if let Some(validate) = self.validator {
            validate(args).map_err(|reason| SyntaxError::InvalidArgument {
                name: self.name.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Arguments used in place of ones that failed `check_args`.
    pub fn placeholder_args(&self) -> Vec<String> {
        vec![PLACEHOLDER_ARG.to_string(); self.arity.min()]
    }
}

/// A registered inline op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDescriptor {
    pub name: String,
}

/// Lookup tables for commands and inline ops.
#[derive(Debug, Clone, Default)]
pub struct SyntaxRegistry {
    commands: Vec<SyntaxDescriptor>,
    command_index: HashMap<String, usize>,
    inlines: Vec<InlineDescriptor>,
    inline_index: HashMap<String, usize>,
}

static STANDARD: Lazy<SyntaxRegistry> = Lazy::new(SyntaxRegistry::builtin);

impl SyntaxRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide standard vocabulary.
    pub fn standard() -> &'static SyntaxRegistry {
        &STANDARD
    }

    /// Build a fresh copy of the standard vocabulary.
    ///
    /// Use this as a starting point when a host needs extra commands.
    pub fn builtin() -> Self {
        use Arity::{Exact, Range};
        use BlockPolicy::{Optional, Required};

        let mut reg = Self::new();

        reg.register_block("read", Exact(0), Required, None);
        reg.register_block("lead", Exact(0), Required, None);
        reg.register_block("list", Exact(2), Required, Some(non_empty_id));
        reg.register_block("emlist", Range(0, 1), Required, None);
        reg.register_block("cmd", Range(0, 1), Required, None);
        reg.register_block("table", Range(0, 3), Required, None);
        reg.register_block("quote", Exact(0), Required, None);
        reg.register_block("image", Range(2, 3), Optional, Some(non_empty_id));
        reg.register_block("source", Exact(1), Required, None);
        reg.register_block("listnum", Exact(2), Required, Some(non_empty_id));
        reg.register_block("emlistnum", Range(0, 1), Required, None);
        reg.register_block("bibpaper", Range(2, 3), Optional, Some(non_empty_id));
        reg.register_block("doorquote", Exact(1), Required, None);
        reg.register_block("talk", Exact(0), Required, None);
        reg.register_block("address", Exact(0), Required, None);
        reg.register_block("blockquote", Exact(0), Required, None);
        reg.register_block("bpo", Exact(0), Required, None);
        reg.register_block("flushright", Exact(0), Required, None);
        reg.register_block("note", Range(0, 1), Required, None);
        reg.register_block("box", Range(0, 1), Required, None);
        reg.register_block("memo", Range(0, 1), Required, None);

        reg.register_single("footnote", Exact(2), Some(non_empty_id));
        reg.register_single("comment", Exact(1), None);
        reg.register_single("noindent", Exact(0), None);
        reg.register_single("linebreak", Exact(0), None);
        reg.register_single("pagebreak", Exact(0), None);
        reg.register_single("numberlessimage", Exact(2), Some(non_empty_id));
        reg.register_single("hr", Exact(0), None);
        reg.register_single("parasep", Exact(0), None);
        reg.register_single("label", Exact(1), Some(non_empty_id));
        reg.register_single("raw", Exact(1), None);
        reg.register_single("tsize", Exact(1), None);

        for op in [
            "chapref", "chap", "title", "img", "list", "table", "fn", "kw", "ruby", "bou", "ami",
            "b", "dtp", "code", "bib", "hd", "href", "recipe", "u", "abbr", "acronym", "cite",
            "dfn", "em", "kbd", "q", "samp", "strong", "var", "big", "small", "del", "ins",
            "sup", "sub", "tt", "i", "raw",
        ] {
            reg.register_inline(op);
        }

        reg
    }

    /// Register a block command. Re-registering a name replaces it.
    pub fn register_block(
        &mut self,
        name: &str,
        arity: Arity,
        block_policy: BlockPolicy,
        validator: Option<Validator>,
    ) {
        self.insert_command(SyntaxDescriptor {
            name: name.to_string(),
            arity,
            block_policy,
            validator,
        });
    }

    /// Register a single-line command.
    pub fn register_single(&mut self, name: &str, arity: Arity, validator: Option<Validator>) {
        self.insert_command(SyntaxDescriptor {
            name: name.to_string(),
            arity,
            block_policy: BlockPolicy::Disallowed,
            validator,
        });
    }

    pub fn register_inline(&mut self, name: &str) {
        if self.inline_index.contains_key(name) {
            return;
        }
        self.inline_index.insert(name.to_string(), self.inlines.len());
        self.inlines.push(InlineDescriptor {
            name: name.to_string(),
        });
    }

    fn insert_command(&mut self, descriptor: SyntaxDescriptor) {
        match self.command_index.get(&descriptor.name) {
            Some(&idx) => self.commands[idx] = descriptor,
            None => {
                self.command_index
                    .insert(descriptor.name.clone(), self.commands.len());
                self.commands.push(descriptor);
            }
        }
    }

    /// Find a block or single-line command.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&SyntaxDescriptor> {
        self.command_index.get(name).map(|&idx| &self.commands[idx])
    }

    #[inline]
    pub fn is_inline(&self, name: &str) -> bool {
        self.inline_index.contains_key(name)
    }

    /// Commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &SyntaxDescriptor> {
        self.commands.iter()
    }

    /// Inline ops in registration order.
    pub fn inlines(&self) -> impl Iterator<Item = &InlineDescriptor> {
        self.inlines.iter()
    }
}

fn non_empty_id(args: &[String]) -> Result<(), String> {
    match args.first() {
        Some(id) if strip(id).is_empty() => Err("id must not be empty".to_string()),
        _ => Ok(()),
    }
}

/// Split a `//name[a][b]{` line into the command name and its argument text.
///
/// The argument text has trailing whitespace and one trailing `{` removed.
/// Returns `None` unless the line starts with `//` and a lowercase name.
pub fn split_command(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("//")?;
    let name_len = rest.bytes().take_while(u8::is_ascii_lowercase).count();
    if name_len == 0 {
        return None;
    }
    let (name, tail) = rest.split_at(name_len);
    let tail = strip_end(tail);
    Some((name, tail.strip_suffix('{').unwrap_or(tail)))
}

/// Whether a command line opens a `{ ... //}` body.
#[inline]
pub fn opens_block(line: &str) -> bool {
    strip_end(line).ends_with('{')
}

/// Split `[a][b][c]` into its arguments.
///
/// An empty string and `[]` have no arguments. Anything that does not start
/// with `[` and end with `]` is malformed.
pub fn parse_args(s: &str) -> Result<Vec<String>, SyntaxError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    match s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        Some("") => Ok(Vec::new()),
        Some(inner) => Ok(inner.split("][").map(str::to_string).collect()),
        None => Err(SyntaxError::MalformedArguments(s.to_string())),
    }
}
