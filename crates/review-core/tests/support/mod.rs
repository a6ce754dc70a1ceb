//! A strategy that records every call, for asserting on the call sequence.

#![allow(dead_code)]

use std::collections::HashSet;

use review_core::{
    Chapter, CompileResult, Compiler, Config, Diagnostic, DocumentContext, Strategy,
    StrategyError, StrategyResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Headline(usize, Option<String>, String),
    SectionBegin(String, usize, Option<String>, String),
    SectionEnd(String, usize),
    UlBegin,
    UlItem(Vec<String>),
    UlEnd,
    OlBegin,
    OlItem(Vec<String>, String),
    OlEnd,
    ChoiceMultiBegin,
    ChoiceMultiEnd,
    ChoiceSingleBegin,
    ChoiceSingleEnd,
    DlBegin,
    Dt(String),
    Dd(Vec<String>),
    DlEnd,
    Paragraph(Vec<String>),
    Block(String, Vec<String>, Vec<String>),
    Single(String, Vec<String>),
    Unknown(Vec<String>, Option<Vec<String>>),
}

#[derive(Debug, Default)]
pub struct RecordingStrategy {
    pub calls: Vec<Call>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub commands: HashSet<String>,
    pub inlines: HashSet<String>,
    pub sections: HashSet<String>,
    pub binds: usize,
}

impl RecordingStrategy {
    /// Supports `b`, `column` and the commands the tests use.
    pub fn new() -> Self {
        Self::default()
            .with_commands(&["list", "image", "quote", "emlist", "footnote", "hr", "table"])
            .with_inlines(&["b", "fn"])
            .with_sections(&["column"])
    }

    pub fn bare() -> Self {
        Self::default()
    }

    pub fn with_commands(mut self, names: &[&str]) -> Self {
        self.commands.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_inlines(mut self, ops: &[&str]) -> Self {
        self.inlines.extend(ops.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_sections(mut self, tags: &[&str]) -> Self {
        self.sections.extend(tags.iter().map(|n| n.to_string()));
        self
    }
}

fn owned(lines: &[String]) -> Vec<String> {
    lines.to_vec()
}

impl Strategy for RecordingStrategy {
    fn bind(&mut self, _chapter: &dyn DocumentContext) {
        self.calls.clear();
        self.warnings.clear();
        self.errors.clear();
        self.binds += 1;
    }

    fn headline(&mut self, level: usize, label: Option<&str>, caption: &str) {
        self.calls.push(Call::Headline(
            level,
            label.map(str::to_string),
            caption.to_string(),
        ));
    }

    fn supports_tagged_section(&self, tag: &str) -> bool {
        self.sections.contains(tag)
    }

    fn tagged_section_begin(
        &mut self,
        tag: &str,
        level: usize,
        label: Option<&str>,
        caption: &str,
    ) -> StrategyResult {
        self.calls.push(Call::SectionBegin(
            tag.to_string(),
            level,
            label.map(str::to_string),
            caption.to_string(),
        ));
        Ok(())
    }

    fn tagged_section_end(&mut self, tag: &str, level: usize) -> StrategyResult {
        self.calls.push(Call::SectionEnd(tag.to_string(), level));
        Ok(())
    }

    fn ul_begin(&mut self) {
        self.calls.push(Call::UlBegin);
    }

    fn ul_item(&mut self, lines: &[String]) {
        self.calls.push(Call::UlItem(owned(lines)));
    }

    fn ul_end(&mut self) {
        self.calls.push(Call::UlEnd);
    }

    fn ol_begin(&mut self) {
        self.calls.push(Call::OlBegin);
    }

    fn ol_item(&mut self, lines: &[String], number: &str) {
        self.calls.push(Call::OlItem(owned(lines), number.to_string()));
    }

    fn ol_end(&mut self) {
        self.calls.push(Call::OlEnd);
    }

    fn choice_multi_begin(&mut self) {
        self.calls.push(Call::ChoiceMultiBegin);
    }

    fn choice_multi_end(&mut self) {
        self.calls.push(Call::ChoiceMultiEnd);
    }

    fn choice_single_begin(&mut self) {
        self.calls.push(Call::ChoiceSingleBegin);
    }

    fn choice_single_end(&mut self) {
        self.calls.push(Call::ChoiceSingleEnd);
    }

    fn dl_begin(&mut self) {
        self.calls.push(Call::DlBegin);
    }

    fn dt(&mut self, term: &str) {
        self.calls.push(Call::Dt(term.to_string()));
    }

    fn dd(&mut self, lines: &[String]) {
        self.calls.push(Call::Dd(owned(lines)));
    }

    fn dl_end(&mut self) {
        self.calls.push(Call::DlEnd);
    }

    fn paragraph(&mut self, lines: &[String]) {
        self.calls.push(Call::Paragraph(owned(lines)));
    }

    fn supports_command(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    fn block_command(
        &mut self,
        _chapter: &dyn DocumentContext,
        name: &str,
        body: &[String],
        args: &[String],
    ) -> StrategyResult {
        self.calls
            .push(Call::Block(name.to_string(), owned(body), owned(args)));
        Ok(())
    }

    fn single_command(
        &mut self,
        _chapter: &dyn DocumentContext,
        name: &str,
        args: &[String],
    ) -> StrategyResult {
        self.calls.push(Call::Single(name.to_string(), owned(args)));
        Ok(())
    }

    fn unknown_command(&mut self, args: &[String], body: Option<&[String]>) {
        self.calls
            .push(Call::Unknown(owned(args), body.map(|b| b.to_vec())));
    }

    fn supports_inline(&self, op: &str) -> bool {
        self.inlines.contains(op)
    }

    fn inline(
        &mut self,
        chapter: &dyn DocumentContext,
        op: &str,
        arg: &str,
    ) -> StrategyResult<String> {
        match op {
            "fn" => chapter
                .footnote(arg)
                .map(|f| format!("[{}]", f.number))
                .ok_or_else(|| StrategyError::render(format!("unknown footnote: {arg}"))),
            _ => Ok(format!("<{op}>{arg}</{op}>")),
        }
    }

    fn nofunc_text(&mut self, text: &str) -> String {
        text.to_string()
    }

    fn warn(&mut self, diagnostic: &Diagnostic) {
        self.warnings.push(diagnostic.message.clone());
    }

    fn error(&mut self, diagnostic: &Diagnostic) {
        self.errors.push(diagnostic.message.clone());
    }

    fn result(&mut self) -> String {
        format!("{} calls", self.calls.len())
    }
}

/// Compile `source` as chapter 1 and return the strategy with the result.
pub fn record(source: &str) -> (RecordingStrategy, CompileResult) {
    record_with(RecordingStrategy::new(), Config::default(), source)
}

pub fn record_with(
    strategy: RecordingStrategy,
    config: Config,
    source: &str,
) -> (RecordingStrategy, CompileResult) {
    let chapter = Chapter::new("ch01.re", Some(1), source);
    let mut compiler = Compiler::new(strategy).with_config(config);
    let result = compiler.compile(&chapter);
    (compiler.into_strategy(), result)
}

pub fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| s.to_string()).collect()
}

/// Diagnostic messages in order.
pub fn messages(result: &CompileResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .map(|d| d.message.clone())
        .collect()
}
