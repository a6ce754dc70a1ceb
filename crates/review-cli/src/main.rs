//! rvcli - compile, validate and inspect chapters
//!
//! Usage:
//!   rvcli [OPTIONS] <COMMAND>
//!
//! Commands:
//!   compile   Compile a chapter to LaTeX or HTML
//!   validate  Check a chapter for errors
//!   stats     Show chapter statistics
//!   syntax    List the known block commands and inline ops
//!
//! Diagnostics are logged to stderr as they are reported; set `RUST_LOG` or
//! pass `-v` for compiler progress.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use review_core::builders::{HtmlStrategy, LatexStrategy};
use review_core::{
    Chapter, ChapterKind, CompileResult, Compiler, Config, DocumentContext, Severity, Strategy,
    StrategyResult, SyntaxRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "rvcli", version, about = "Compile and validate chapters", long_about = None)]
struct Cli {
    /// Log compiler progress (-vv for every construct)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a chapter to LaTeX or HTML
    Compile(CompileArgs),
    /// Check a chapter for errors without writing output
    Validate(ValidateArgs),
    /// Show chapter statistics
    Stats(StatsArgs),
    /// List the known block commands and inline ops
    Syntax {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ChapterArgs {
    /// Chapter source file
    file: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chapter number used in headline numbers and references
    #[arg(short = 'n', long, default_value_t = 1)]
    chapter_number: u32,

    /// Where the chapter sits in the book
    #[arg(long, value_enum, default_value_t = KindArg::Chapter)]
    kind: KindArg,

    /// Prefix headlines with their number
    #[arg(long)]
    numbering: bool,

    /// Directory searched for image files (default: `images` next to FILE)
    #[arg(long)]
    images: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompileArgs {
    #[command(flatten)]
    chapter: ChapterArgs,

    #[arg(short, long, value_enum, default_value_t = Format::Latex)]
    format: Format,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail without writing output if any error is reported
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    #[command(flatten)]
    chapter: ChapterArgs,

    #[arg(short, long, value_enum, default_value_t = Format::Latex)]
    format: Format,

    /// Output in JSON format
    #[arg(short, long)]
    json: bool,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    chapter: ChapterArgs,

    /// Output in JSON format
    #[arg(short, long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Latex,
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Chapter,
    Preface,
    Appendix,
    Postscript,
}

impl From<KindArg> for ChapterKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Chapter => ChapterKind::Chapter,
            KindArg::Preface => ChapterKind::Preface,
            KindArg::Appendix => ChapterKind::Appendix,
            KindArg::Postscript => ChapterKind::Postscript,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Compile(args) => cmd_compile(&args),
        Command::Validate(args) => cmd_validate(&args),
        Command::Stats(args) => cmd_stats(&args),
        Command::Syntax { json } => cmd_syntax(json),
    }
}

// =============================================================================
// Loading
// =============================================================================

impl ChapterArgs {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if self.numbering {
            config.heading_numbering = true;
        }
        Ok(config)
    }

    fn load_chapter(&self) -> Result<Chapter> {
        let source = fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read '{}'", self.file.display()))?;
        let basename = self
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string());

        let number = match self.kind {
            KindArg::Chapter | KindArg::Appendix => Some(self.chapter_number),
            KindArg::Preface | KindArg::Postscript => None,
        };
        let mut chapter = Chapter::new(basename, number, source).with_kind(self.kind.into());

        let images = match &self.images {
            Some(dir) => dir.clone(),
            None => self
                .file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("images"),
        };
        if images.is_dir() {
            let bound = chapter.bind_images(&images);
            debug!(dir = %images.display(), bound, "searched for images");
        }
        Ok(chapter)
    }
}

fn compile_with(format: Format, chapter: &Chapter, config: Config) -> CompileResult {
    match format {
        Format::Latex => Compiler::new(LatexStrategy::new())
            .with_config(config)
            .compile(chapter),
        Format::Html => Compiler::new(HtmlStrategy::new())
            .with_config(config)
            .compile(chapter),
    }
}

// =============================================================================
// Compile Command
// =============================================================================

fn cmd_compile(args: &CompileArgs) -> Result<()> {
    let config = args.chapter.load_config()?;
    let chapter = args.chapter.load_chapter()?;
    let result = compile_with(args.format, &chapter, config);

    let errors = result.diagnostics.error_count();
    if args.strict && errors > 0 {
        bail!("{errors} error(s) reported, no output written");
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &result.output)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            info!(path = %path.display(), bytes = result.output.len(), "wrote output");
        }
        None => print!("{}", result.output),
    }

    if !result.diagnostics.is_empty() {
        eprintln!(
            "{}: {} error(s), {} warning(s)",
            chapter.basename(),
            errors,
            result.diagnostics.warnings().count()
        );
    }
    Ok(())
}

// =============================================================================
// Validate Command
// =============================================================================

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    severity: &'static str,
    file: &'a str,
    line: usize,
    message: &'a str,
}

#[derive(Serialize)]
struct JsonValidation<'a> {
    valid: bool,
    errors: Vec<JsonDiagnostic<'a>>,
    warnings: Vec<JsonDiagnostic<'a>>,
}

fn validation_report(result: &CompileResult) -> JsonValidation<'_> {
    let convert = move |severity: Severity| {
        result
            .diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| JsonDiagnostic {
                severity: d.severity.as_str(),
                file: &d.location.file,
                line: d.location.line,
                message: &d.message,
            })
            .collect::<Vec<_>>()
    };
    JsonValidation {
        valid: result.is_ok(),
        errors: convert(Severity::Error),
        warnings: convert(Severity::Warning),
    }
}

fn cmd_validate(args: &ValidateArgs) -> Result<()> {
    let config = args.chapter.load_config()?;
    let chapter = args.chapter.load_chapter()?;
    let result = compile_with(args.format, &chapter, config);

    if args.json {
        println!("{}", serde_json::to_string(&validation_report(&result))?);
    } else if result.is_ok() {
        println!("Valid: no errors found");
    } else {
        eprintln!("Invalid: {} error(s) found", result.diagnostics.error_count());
    }

    if !result.is_ok() {
        bail!("{} error(s) found", result.diagnostics.error_count());
    }
    Ok(())
}

// =============================================================================
// Stats Command
// =============================================================================

/// Counts constructs instead of rendering them.
#[derive(Debug, Default, Serialize)]
struct ChapterStats {
    headlines: usize,
    tagged_sections: usize,
    paragraphs: usize,
    lists: usize,
    list_items: usize,
    definitions: usize,
    commands: BTreeMap<String, usize>,
    inline_ops: BTreeMap<String, usize>,
    unknown_commands: usize,
    errors: usize,
    warnings: usize,
    chars: usize,
    lines: usize,
}

impl Strategy for ChapterStats {
    fn headline(&mut self, _level: usize, _label: Option<&str>, _caption: &str) {
        self.headlines += 1;
    }

    fn supports_tagged_section(&self, _tag: &str) -> bool {
        true
    }

    fn tagged_section_begin(
        &mut self,
        _tag: &str,
        _level: usize,
        _label: Option<&str>,
        _caption: &str,
    ) -> StrategyResult {
        self.tagged_sections += 1;
        Ok(())
    }

    fn tagged_section_end(&mut self, _tag: &str, _level: usize) -> StrategyResult {
        Ok(())
    }

    fn ul_begin(&mut self) {
        self.lists += 1;
    }

    fn ul_item(&mut self, _lines: &[String]) {
        self.list_items += 1;
    }

    fn ol_begin(&mut self) {
        self.lists += 1;
    }

    fn ol_item(&mut self, _lines: &[String], _number: &str) {
        self.list_items += 1;
    }

    fn choice_multi_begin(&mut self) {
        self.lists += 1;
    }

    fn choice_single_begin(&mut self) {
        self.lists += 1;
    }

    fn dt(&mut self, _term: &str) {
        self.definitions += 1;
    }

    fn dd(&mut self, _lines: &[String]) {}

    fn paragraph(&mut self, _lines: &[String]) {
        self.paragraphs += 1;
    }

    fn supports_command(&self, _name: &str) -> bool {
        true
    }

    fn block_command(
        &mut self,
        _chapter: &dyn DocumentContext,
        name: &str,
        _body: &[String],
        _args: &[String],
    ) -> StrategyResult {
        *self.commands.entry(name.to_string()).or_default() += 1;
        Ok(())
    }

    fn single_command(
        &mut self,
        _chapter: &dyn DocumentContext,
        name: &str,
        _args: &[String],
    ) -> StrategyResult {
        *self.commands.entry(name.to_string()).or_default() += 1;
        Ok(())
    }

    fn unknown_command(&mut self, _args: &[String], _body: Option<&[String]>) {
        self.unknown_commands += 1;
    }

    fn supports_inline(&self, _op: &str) -> bool {
        true
    }

    fn inline(
        &mut self,
        _chapter: &dyn DocumentContext,
        op: &str,
        arg: &str,
    ) -> StrategyResult<String> {
        *self.inline_ops.entry(op.to_string()).or_default() += 1;
        Ok(arg.to_string())
    }

    fn nofunc_text(&mut self, text: &str) -> String {
        text.to_string()
    }

    fn result(&mut self) -> String {
        String::new()
    }
}

fn collect_stats(chapter: &Chapter, config: Config) -> ChapterStats {
    let mut compiler = Compiler::new(ChapterStats::default()).with_config(config);
    let result = compiler.compile(chapter);

    let mut stats = compiler.into_strategy();
    stats.errors = result.diagnostics.error_count();
    stats.warnings = result.diagnostics.warnings().count();
    stats.chars = chapter.content().chars().count();
    stats.lines = chapter.content().lines().count();
    stats
}

fn cmd_stats(args: &StatsArgs) -> Result<()> {
    let config = args.chapter.load_config()?;
    let chapter = args.chapter.load_chapter()?;
    let stats = collect_stats(&chapter, config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Chapter Statistics");
    println!("------------------");
    println!("File:             {}", chapter.basename());
    println!();
    println!("Content:");
    println!("  Headlines:        {}", stats.headlines);
    println!("  Tagged sections:  {}", stats.tagged_sections);
    println!("  Paragraphs:       {}", stats.paragraphs);
    println!("  Lists:            {}", stats.lists);
    println!("  List items:       {}", stats.list_items);
    println!("  Definitions:      {}", stats.definitions);
    for (name, count) in &stats.commands {
        println!("  //{name:<15} {count}");
    }
    for (op, count) in &stats.inline_ops {
        println!("  @<{op}>{:<width$} {count}", "", width = 14usize.saturating_sub(op.len()));
    }
    println!();
    println!("Size:");
    println!("  Characters:       {}", stats.chars);
    println!("  Lines:            {}", stats.lines);
    println!();
    println!("Unknown commands: {}", stats.unknown_commands);
    println!("Errors:           {}", stats.errors);
    println!("Warnings:         {}", stats.warnings);

    Ok(())
}

// =============================================================================
// Syntax Command
// =============================================================================

fn cmd_syntax(json: bool) -> Result<()> {
    let registry = SyntaxRegistry::standard();

    if json {
        let commands: Vec<_> = registry
            .commands()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "block": d.is_block(),
                    "arity": d.arity.to_string(),
                    "block_policy": format!("{:?}", d.block_policy).to_lowercase(),
                })
            })
            .collect();
        let inlines: Vec<_> = registry.inlines().map(|d| d.name.as_str()).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "commands": commands,
                "inline_ops": inlines,
            }))?
        );
        return Ok(());
    }

    println!("Block commands:");
    for d in registry.commands().filter(|d| d.is_block()) {
        println!(
            "  //{:<16} args {:<6} body {:?}",
            d.name, d.arity.to_string(), d.block_policy
        );
    }
    println!();
    println!("Single-line commands:");
    for d in registry.commands().filter(|d| !d.is_block()) {
        println!("  //{:<16} args {}", d.name, d.arity);
    }
    println!();
    let ops: Vec<_> = registry.inlines().map(|d| d.name.as_str()).collect();
    println!("Inline ops:");
    println!("  {}", ops.join(" "));

    Ok(())
}
