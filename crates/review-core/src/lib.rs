//! # Review Core
//!
//! A compiler for a line-oriented book markup with pluggable output.
//!
//! A chapter is read top to bottom, one construct at a time: headlines,
//! paragraphs, indented lists, definition lists and `//command[args]{ ... //}`
//! blocks. Each construct is handed to a [`Strategy`], which decides what the
//! output looks like. LaTeX and HTML strategies are bundled in [`builders`].
//!
//! ## Quick Start
//!
//! ```rust
//! use review_core::builders::LatexStrategy;
//! use review_core::{Chapter, Compiler};
//!
//! let chapter = Chapter::new("ch01.re", Some(1), "= Hello\n\nThis is @<b>{bold}.\n");
//! let mut compiler = Compiler::new(LatexStrategy::new());
//! let result = compiler.compile(&chapter);
//!
//! assert!(result.is_ok());
//! assert!(result.output.contains("\\textbf{bold}"));
//! ```
//!
//! ## Error Recovery
//!
//! Malformed input never stops compilation. Problems are collected as
//! diagnostics and the rest of the chapter is still rendered:
//!
//! ```rust
//! use review_core::builders::HtmlStrategy;
//! use review_core::{Chapter, Compiler};
//!
//! let chapter = Chapter::new("ch01.re", Some(1), "//nosuch{\nbody\n//}\n\nStill here.\n");
//! let result = Compiler::new(HtmlStrategy::new()).compile(&chapter);
//!
//! assert_eq!(result.diagnostics.error_count(), 1);
//! assert!(result.output.contains("<p>Still here.</p>"));
//! ```
//!
//! Use [`Compiler::compile_strict`] to turn any error into a [`CompileError`].

pub mod builders;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod inline;
pub mod location;
pub mod scanner;
pub mod state;
pub mod strategy;
pub mod syntax;

pub use compiler::{classify, CompileResult, Compiler, LineKind};
pub use config::{Config, ConfigError};
pub use context::{Chapter, ChapterKind, DocumentContext};
pub use error::{CompileError, Diagnostic, Diagnostics, InlineError, Severity, SyntaxError};
pub use location::Location;
pub use strategy::{Strategy, StrategyError, StrategyResult};
pub use syntax::{Arity, BlockPolicy, SyntaxDescriptor, SyntaxRegistry};
