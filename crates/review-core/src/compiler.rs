//! The compiler: classifies lines, tracks sections and dispatches to a strategy.
//!
//! Input is consumed strictly forward. Each construct owns the lines it
//! consumes; malformed input is reported as a [`Diagnostic`] and compiled as
//! well as possible, so a chapter always produces output.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::context::DocumentContext;
use crate::error::{CompileError, Diagnostic, Diagnostics, Severity};
use crate::inline;
use crate::location::Location;
use crate::scanner::{strip, strip_end, Line, LineScanner};
use crate::state::{RunState, TaggedSectionFrame};
use crate::strategy::{Strategy, StrategyError};
use crate::syntax::{self, BlockPolicy, SyntaxDescriptor, SyntaxRegistry};

static HEADLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(=+)(?:\[(.+?)\])?(?:\{(.+?)\})?(.*)$").expect("headline pattern is valid")
});

/// What a line starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Headline,
    UnorderedList,
    MultiChoice,
    SingleChoice,
    OrderedList,
    DefinitionList,
    /// `//}` with no open block.
    StrayBlockEnd,
    Command,
    /// `//` not followed by a command name.
    InvalidCommand,
    Blank,
    Paragraph,
}

/// Ordered classification table; the first matching predicate wins.
const CLASSIFIERS: &[(LineKind, fn(&str) -> bool)] = &[
    (LineKind::Headline, is_headline),
    (LineKind::UnorderedList, is_bullet_item),
    (LineKind::MultiChoice, is_multi_choice_item),
    (LineKind::SingleChoice, is_single_choice_item),
    (LineKind::OrderedList, is_numbered_item),
    (LineKind::DefinitionList, is_definition),
    (LineKind::StrayBlockEnd, is_block_end),
    (LineKind::Command, is_command),
    (LineKind::InvalidCommand, is_command_prefix),
    (LineKind::Blank, is_blank),
];

/// Classify a line by its leading text.
pub fn classify(line: &str) -> LineKind {
    CLASSIFIERS
        .iter()
        .find(|(_, matches)| matches(line))
        .map_or(LineKind::Paragraph, |&(kind, _)| kind)
}

fn is_headline(line: &str) -> bool {
    let rest = line.trim_start_matches('=');
    rest.len() < line.len()
        && rest
            .chars()
            .next()
            .map_or(true, |c| c == '[' || c == '{' || c.is_ascii_whitespace())
}

fn is_bullet_item(line: &str) -> bool {
    ListMarker::Bullet.starts_item(line)
}

fn is_multi_choice_item(line: &str) -> bool {
    ListMarker::MultiChoice.starts_item(line)
}

fn is_single_choice_item(line: &str) -> bool {
    ListMarker::SingleChoice.starts_item(line)
}

fn is_numbered_item(line: &str) -> bool {
    ListMarker::Number.starts_item(line)
}

fn is_definition(line: &str) -> bool {
    line.strip_prefix(':')
        .is_some_and(|rest| rest.chars().next().map_or(true, |c| c.is_ascii_whitespace()))
}

fn is_block_end(line: &str) -> bool {
    line.starts_with("//}")
}

fn is_command(line: &str) -> bool {
    syntax::split_command(line).is_some()
}

fn is_command_prefix(line: &str) -> bool {
    line.starts_with("//")
}

fn is_blank(line: &str) -> bool {
    strip(line).is_empty()
}

/// Text after at least one whitespace character of indentation.
fn after_indent(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_whitespace());
    (rest.len() < line.len()).then_some(rest)
}

/// `12.` at the start of `s`; returns the digits.
fn number_marker(s: &str) -> Option<&str> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    (digits > 0 && s[digits..].starts_with('.')).then(|| &s[..digits])
}

/// The indented list families. Items start with an indented marker and
/// continue over indented lines that do not start another item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMarker {
    Bullet,
    MultiChoice,
    SingleChoice,
    Number,
}

impl ListMarker {
    fn marks(self, rest: &str) -> bool {
        match self {
            ListMarker::Bullet => rest.starts_with('*'),
            ListMarker::MultiChoice => rest.starts_with('□'),
            ListMarker::SingleChoice => rest.starts_with('○'),
            ListMarker::Number => number_marker(rest).is_some(),
        }
    }

    fn starts_item(self, line: &str) -> bool {
        after_indent(line).is_some_and(|rest| self.marks(rest))
    }

    fn continues_item(self, line: &str) -> bool {
        after_indent(line).is_some_and(|rest| !rest.is_empty() && !self.marks(rest))
    }

    /// Split an item line into its number (empty unless numbered) and text.
    fn split_item(self, line: &str) -> (&str, &str) {
        let rest = after_indent(line).unwrap_or(line);
        match self {
            ListMarker::Number => match number_marker(rest) {
                Some(digits) => (digits, strip(&rest[digits.len() + 1..])),
                None => ("", strip(rest)),
            },
            ListMarker::Bullet => ("", strip(rest.strip_prefix('*').unwrap_or(rest))),
            ListMarker::MultiChoice => ("", strip(rest.strip_prefix('□').unwrap_or(rest))),
            ListMarker::SingleChoice => ("", strip(rest.strip_prefix('○').unwrap_or(rest))),
        }
    }
}

/// Trim a paragraph line but keep its leading tabs.
fn preserve_leading_tabs(line: &str) -> Cow<'_, str> {
    let tabs = line.bytes().take_while(|&b| b == b'\t').count();
    if tabs == 0 {
        return Cow::Borrowed(strip(line));
    }
    let mut out = "\t".repeat(tabs);
    out.push_str(strip(&line[tabs..]));
    Cow::Owned(out)
}

/// Output of one compile run.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Whatever the strategy produced.
    pub output: String,
    /// Every warning and error, in the order reported.
    pub diagnostics: Diagnostics,
}

impl CompileResult {
    /// Check if the chapter compiled without errors (warnings allowed).
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// The output, or the first error if there was any.
    pub fn into_result(self) -> Result<String, CompileError> {
        let first = self.diagnostics.errors().next().cloned();
        match first {
            None => Ok(self.output),
            Some(first) => Err(CompileError {
                first,
                count: self.diagnostics.error_count(),
                diagnostics: self.diagnostics,
            }),
        }
    }
}

/// Compiles chapters with a strategy.
///
/// # Example
///
/// ```rust
/// use review_core::builders::HtmlStrategy;
/// use review_core::context::Chapter;
/// use review_core::{Compiler, Config};
///
/// let chapter = Chapter::new("ch01.re", Some(1), "= Hello\n\nSome @<b>{bold} text.\n");
/// let mut compiler = Compiler::new(HtmlStrategy::new())
///     .with_config(Config::default().with_heading_numbering(true));
///
/// let result = compiler.compile(&chapter);
/// assert!(result.is_ok());
/// assert!(result.output.contains("<h1>1 Hello</h1>"));
/// ```
pub struct Compiler<S: Strategy> {
    strategy: S,
    config: Config,
    registry: &'static SyntaxRegistry,
}

impl<S: Strategy> Compiler<S> {
    /// Create a compiler with default configuration and the standard registry.
    pub fn new(strategy: S) -> Self {
        let mut compiler = Self {
            strategy,
            config: Config::default(),
            registry: SyntaxRegistry::standard(),
        };
        compiler.strategy.configure(&compiler.config);
        compiler
    }

    /// Use a different command vocabulary.
    pub fn with_registry(mut self, registry: &'static SyntaxRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.set_config(config);
        self
    }

    /// Replace the configuration and pass it on to the strategy.
    pub fn set_config(&mut self, config: Config) {
        self.strategy.configure(&config);
        self.config = config;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &'static SyntaxRegistry {
        self.registry
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn into_strategy(self) -> S {
        self.strategy
    }

    /// Compile a chapter, collecting diagnostics instead of failing.
    pub fn compile(&mut self, chapter: &dyn DocumentContext) -> CompileResult {
        let content = chapter.content();
        debug!(
            chapter = chapter.id(),
            lines = content.lines().count(),
            "compiling chapter"
        );

        self.strategy.bind(chapter);
        let session = Session {
            strategy: &mut self.strategy,
            chapter,
            config: &self.config,
            registry: self.registry,
            lines: LineScanner::new(content),
            file: chapter.basename().to_string(),
            at: 0,
            state: RunState::new(chapter.number()),
        };
        let diagnostics = session.run();

        CompileResult {
            output: self.strategy.result(),
            diagnostics,
        }
    }

    /// Compile a chapter, failing if any error was reported.
    pub fn compile_strict(&mut self, chapter: &dyn DocumentContext) -> Result<String, CompileError> {
        self.compile(chapter).into_result()
    }
}

/// How the lines of a `{ ... //}` body are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    /// Right-trim and resolve inline markup.
    Resolve,
    /// Right-trim only.
    Preformatted,
    /// Consume without collecting.
    Discard,
}

/// One compile run over one chapter.
struct Session<'c, S: Strategy> {
    strategy: &'c mut S,
    chapter: &'c dyn DocumentContext,
    config: &'c Config,
    registry: &'c SyntaxRegistry,
    lines: LineScanner<'c>,
    file: String,
    /// Line that diagnostics are attributed to.
    at: usize,
    state: RunState,
}

impl<'c, S: Strategy> Session<'c, S> {
    fn run(mut self) -> Diagnostics {
        while let Some(line) = self.lines.peek() {
            let kind = classify(line.text);
            if kind != LineKind::Blank {
                debug!(line = line.number, kind = ?kind, "construct");
            }
            self.at = line.number;

            match kind {
                LineKind::Headline => {
                    self.lines.next_line();
                    self.headline(line.text);
                }
                LineKind::UnorderedList => self.list(ListMarker::Bullet),
                LineKind::MultiChoice => self.list(ListMarker::MultiChoice),
                LineKind::SingleChoice => self.list(ListMarker::SingleChoice),
                LineKind::OrderedList => self.list(ListMarker::Number),
                LineKind::DefinitionList => self.definition_list(),
                LineKind::StrayBlockEnd => {
                    self.lines.next_line();
                    self.error("block end seen but not opened");
                }
                LineKind::Command => self.command(),
                LineKind::InvalidCommand => self.invalid_command(),
                LineKind::Blank => {
                    self.lines.next_line();
                }
                LineKind::Paragraph => self.paragraph(),
            }
        }

        for frame in self.state.sections.drain_all() {
            self.warn(format!(
                "tagged section not closed before end of input: {}",
                frame.tag
            ));
            self.close_section(frame);
        }

        self.state.diagnostics
    }

    fn report(&mut self, severity: Severity, message: String) {
        let diagnostic = Diagnostic::new(severity, message, Location::new(&self.file, self.at));
        match severity {
            Severity::Warning => self.strategy.warn(&diagnostic),
            Severity::Error => self.strategy.error(&diagnostic),
        }
        self.state.diagnostics.push(diagnostic);
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.report(Severity::Warning, message.into());
    }

    fn error(&mut self, message: impl Into<String>) {
        self.report(Severity::Error, message.into());
    }

    /// Resolve inline markup and render the text.
    fn text(&mut self, s: &str) -> String {
        let mut problems = Vec::new();
        let out = inline::resolve(
            s,
            self.registry,
            &mut *self.strategy,
            self.chapter,
            &mut |message| problems.push(message),
        );
        for message in problems {
            self.error(message);
        }
        out
    }

    fn headline(&mut self, line: &str) {
        let Some(caps) = HEADLINE.captures(line) else {
            return;
        };
        let level = caps.get(1).map_or(1, |m| m.as_str().len());
        let tag = caps.get(2).map(|m| m.as_str());
        let label = caps.get(3).map(|m| m.as_str());
        let caption = caps.get(4).map_or("", |m| strip(m.as_str()));

        match tag {
            Some(tag) => self.open_section(tag, level, label, caption),
            None => {
                self.state.counters.advance(level);
                self.close_sections_from(level);
                let caption = if self.config.heading_numbering && self.chapter.is_numbered() {
                    Cow::Owned(format!("{} {}", self.state.counters.dotted(), caption))
                } else {
                    Cow::Borrowed(caption)
                };
                let caption = self.text(&caption);
                self.strategy.headline(level, label, &caption);
            }
        }
    }

    fn open_section(&mut self, tag: &str, level: usize, label: Option<&str>, caption: &str) {
        self.close_sections_from(level);

        if !self.strategy.supports_tagged_section(tag) {
            self.error(format!("strategy does not support tagged section: {tag}"));
            let caption = self.text(caption);
            self.strategy.headline(level, label, &caption);
            return;
        }

        self.state.sections.push(tag, level);
        let caption = self.text(caption);
        match self.strategy.tagged_section_begin(tag, level, label, &caption) {
            Ok(()) => {}
            Err(StrategyError::Unsupported) => {
                self.error(format!("strategy does not support tagged section: {tag}"))
            }
            Err(StrategyError::Render(message)) => self.error(message),
        }
    }

    fn close_sections_from(&mut self, level: usize) {
        for frame in self.state.sections.close_from(level) {
            self.close_section(frame);
        }
    }

    fn close_section(&mut self, frame: TaggedSectionFrame) {
        match self.strategy.tagged_section_end(&frame.tag, frame.level) {
            Ok(()) => {}
            Err(StrategyError::Unsupported) => {
                self.error(format!("strategy does not support block op: {}_end", frame.tag))
            }
            Err(StrategyError::Render(message)) => self.error(message),
        }
    }

    fn list(&mut self, marker: ListMarker) {
        match marker {
            ListMarker::Bullet => self.strategy.ul_begin(),
            ListMarker::MultiChoice => self.strategy.choice_multi_begin(),
            ListMarker::SingleChoice => self.strategy.choice_single_begin(),
            ListMarker::Number => self.strategy.ol_begin(),
        }

        while let Some(line) = self.lines.next_if(|l| marker.starts_item(l.text)) {
            self.at = line.number;
            let (number, first) = marker.split_item(line.text);
            let mut item = vec![self.text(first)];
            while let Some(cont) = self.lines.next_if(|l| marker.continues_item(l.text)) {
                self.at = cont.number;
                item.push(self.text(strip(cont.text)));
            }
            match marker {
                ListMarker::Number => self.strategy.ol_item(&item, number),
                _ => self.strategy.ul_item(&item),
            }
        }

        match marker {
            ListMarker::Bullet => self.strategy.ul_end(),
            ListMarker::MultiChoice => self.strategy.choice_multi_end(),
            ListMarker::SingleChoice => self.strategy.choice_single_end(),
            ListMarker::Number => self.strategy.ol_end(),
        }
    }

    fn definition_list(&mut self) {
        self.strategy.dl_begin();

        while let Some(line) = self.lines.next_if(|l| l.starts_with(":")) {
            self.at = line.number;
            let term = self.text(strip(&line.text[1..]));
            self.strategy.dt(&term);

            let mut body = self.lines.scan_until(|l| {
                l.text
                    .chars()
                    .next()
                    .is_some_and(|c| !c.is_ascii_whitespace())
            });
            while body.last().is_some_and(Line::is_blank) {
                body.pop();
            }
            let mut lines = Vec::with_capacity(body.len());
            for l in body {
                self.at = l.number;
                lines.push(self.text(strip(l.text)));
            }
            self.strategy.dd(&lines);

            self.lines.skip_blank_lines();
        }

        self.strategy.dl_end();
    }

    fn paragraph(&mut self) {
        let mut lines = Vec::new();
        while let Some(line) = self.lines.next_if(|l| !l.starts_with("//")) {
            if line.is_blank() {
                break;
            }
            self.at = line.number;
            lines.push(self.text(&preserve_leading_tabs(line.text)));
        }
        self.strategy.paragraph(&lines);
    }

    fn invalid_command(&mut self) {
        let Some(line) = self.lines.next_line() else {
            return;
        };
        self.warn(format!(
            "`//' seen but is not valid command: {:?}",
            strip(line.text)
        ));
        if syntax::opens_block(line.text) {
            self.warn("skipping block...");
            self.read_body(line.number, BodyMode::Discard);
        }
    }

    fn command(&mut self) {
        let Some(line) = self.lines.next_line() else {
            return;
        };
        let Some((name, arg_text)) = syntax::split_command(line.text) else {
            return;
        };

        let args = match syntax::parse_args(arg_text) {
            Ok(args) => args,
            Err(err) => {
                self.error(err.to_string());
                Vec::new()
            }
        };

        let body = if syntax::opens_block(line.text) {
            let mode = if syntax::PREFORMATTED.contains(&name) {
                BodyMode::Preformatted
            } else {
                BodyMode::Resolve
            };
            Some(self.read_body(line.number, mode))
        } else {
            None
        };
        self.at = line.number;

        let registry = self.registry;
        match registry.lookup(name) {
            Some(descriptor) => self.dispatch_command(descriptor, args, body),
            None => {
                self.error(format!("unknown command: //{name}"));
                self.strategy.unknown_command(&args, body.as_deref());
            }
        }
    }

    fn dispatch_command(
        &mut self,
        descriptor: &SyntaxDescriptor,
        mut args: Vec<String>,
        body: Option<Vec<String>>,
    ) {
        let name = descriptor.name.as_str();

        if !self.strategy.supports_command(name) {
            self.error(format!("strategy does not support command: //{name}"));
            self.strategy.unknown_command(&args, body.as_deref());
            return;
        }

        if let Err(err) = descriptor.check_args(&args) {
            self.error(err.to_string());
            args = descriptor.placeholder_args();
        }

        let outcome = if descriptor.is_block() {
            let body = match body {
                Some(body) => body,
                None => {
                    if descriptor.block_policy == BlockPolicy::Required {
                        self.error(format!("block is required for //{name}; use empty block"));
                    }
                    Vec::new()
                }
            };
            self.strategy.block_command(self.chapter, name, &body, &args)
        } else {
            if body.is_some() {
                self.error(format!("block is not allowed for command //{name}; ignore"));
            }
            self.strategy.single_command(self.chapter, name, &args)
        };

        match outcome {
            Ok(()) => {}
            Err(StrategyError::Unsupported) => {
                self.error(format!("strategy does not support command: //{name}"))
            }
            Err(StrategyError::Render(message)) => self.error(message),
        }
    }

    /// Collect body lines up to `//}` and consume the terminator.
    fn read_body(&mut self, start: usize, mode: BodyMode) -> Vec<String> {
        let mut body = Vec::new();
        while let Some(line) = self.lines.next_if(|l| !l.starts_with("//}")) {
            match mode {
                BodyMode::Resolve => {
                    self.at = line.number;
                    body.push(self.text(strip_end(line.text)));
                }
                BodyMode::Preformatted => body.push(strip_end(line.text).to_string()),
                BodyMode::Discard => {}
            }
        }

        if self.lines.next_if(|l| l.starts_with("//}")).is_none() {
            self.at = start;
            self.error(format!("unexpected EOF (block begins at: {start})"));
        }
        body
    }
}
