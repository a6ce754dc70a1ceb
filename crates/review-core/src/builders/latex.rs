//! LaTeX output using the `review*` environments of the book class.

use tracing::debug;

use super::{
    detab, image_number, list_number, raw_for, split_pair, split_table, table_number, RawContent,
};
use crate::config::Config;
use crate::context::DocumentContext;
use crate::scanner::strip_end;
use crate::strategy::{Strategy, StrategyError, StrategyResult};

/// Sectioning command per headline level; deeper levels reuse the last.
const HEADLINE: [&str; 5] = ["chapter", "section", "subsection", "subsubsection", "paragraph"];

/// Emphasis dot placed over each character by `@<bou>`.
const BOUTEN: &str = "・";

const BLOCK_COMMANDS: &[&str] = &[
    "read", "lead", "quote", "flushright", "emlist", "emlistnum", "cmd", "list", "listnum",
    "table", "image", "memo", "note",
];

const SINGLE_COMMANDS: &[&str] = &[
    "comment", "label", "pagebreak", "linebreak", "noindent", "parasep", "footnote", "tsize",
    "hr",
];

const INLINE_OPS: &[&str] = &[
    "list", "table", "img", "fn", "bou", "ruby", "b", "strong", "em", "tt", "code", "i", "kw",
    "href", "raw",
];

/// Escape LaTeX special characters.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '#' => out.push_str("\\#"),
            '$' => out.push_str("\\textdollar{}"),
            '%' => out.push_str("\\%"),
            '&' => out.push_str("\\&"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '_' => out.push_str("\\textunderscore{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '|' => out.push_str("\\textbar{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            _ => out.push(c),
        }
    }
    out
}

/// `\name{a}{b}...`
fn macro_call(name: &str, args: &[&str]) -> String {
    let mut out = format!("\\{name}");
    for arg in args {
        out.push('{');
        out.push_str(arg);
        out.push('}');
    }
    out
}

/// Renders a chapter as a LaTeX fragment.
#[derive(Debug)]
pub struct LatexStrategy {
    out: String,
    /// A blank line is written before the next output line.
    blank_needed: bool,
    secnolevel: usize,
}

impl Default for LatexStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl LatexStrategy {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            blank_needed: false,
            secnolevel: Config::default().secnolevel,
        }
    }

    fn puts(&mut self, line: &str) {
        if self.blank_needed {
            self.out.push('\n');
            self.blank_needed = false;
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.blank_needed = true;
    }

    fn puts_all(&mut self, lines: &[String]) {
        for line in lines {
            self.puts(line);
        }
    }

    fn environment(&mut self, env: &str, lines: &[String]) {
        self.blank();
        self.puts(&macro_call("begin", &[env]));
        self.puts_all(lines);
        self.puts(&macro_call("end", &[env]));
        self.blank();
    }

    fn verbatim(&mut self, env: &str, lines: &[String], numbered: bool) {
        self.puts(&macro_call("begin", &[env]));
        self.puts("\\begin{verbatim}");
        for (i, line) in lines.iter().enumerate() {
            if numbered {
                self.puts(&format!("{:>2}: {}", i + 1, line));
            } else {
                self.puts(line);
            }
        }
        self.puts("\\end{verbatim}");
        self.puts(&macro_call("end", &[env]));
    }

    fn minicolumn(&mut self, lines: &[String], caption: Option<&str>) {
        self.puts("\\begin{reviewminicolumn}");
        if let Some(caption) = caption {
            self.puts(&macro_call("reviewminicolumntitle", &[&escape(caption)]));
        }
        self.puts_all(lines);
        self.puts("\\end{reviewminicolumn}");
    }

    fn code_list(
        &mut self,
        chapter: &dyn DocumentContext,
        lines: &[String],
        args: &[String],
        numbered: bool,
    ) -> StrategyResult {
        let id = args.first().map(String::as_str).unwrap_or_default();
        let caption = args.get(1).map(String::as_str).unwrap_or_default();
        let number = list_number(chapter, id)?;
        self.puts(&macro_call("reviewlistcaption", &[&number, &escape(caption)]));
        self.verbatim("reviewlist", lines, numbered);
        self.puts("");
        Ok(())
    }

    fn table(
        &mut self,
        chapter: &dyn DocumentContext,
        lines: &[String],
        args: &[String],
    ) -> StrategyResult {
        let rows = split_table(lines);
        if rows.columns == 0 {
            return Err(StrategyError::render("no rows in the table"));
        }

        if let (Some(id), Some(caption)) = (args.first(), args.get(1)) {
            let number = table_number(chapter, id)?;
            self.puts(&macro_call("reviewtablecaption", &[&number, &escape(caption)]));
        }

        let preamble = match args.get(2) {
            Some(preamble) => preamble.clone(),
            None => vec!["|"; rows.columns + 1].join("l"),
        };
        self.puts(&macro_call("begin", &["reviewtable", &preamble]));
        self.puts("\\hline");
        for row in &rows.header {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| macro_call("textgt", &[cell.as_str()]))
                .collect();
            self.puts(&format!("{} \\\\  \\hline", cells.join(" & ")));
        }
        for row in &rows.body {
            self.puts(&format!("{} \\\\  \\hline", row.join(" & ")));
        }
        self.puts(&macro_call("end", &["reviewtable"]));
        self.blank();
        Ok(())
    }

    fn image(
        &mut self,
        chapter: &dyn DocumentContext,
        lines: &[String],
        args: &[String],
    ) -> StrategyResult {
        let id = args.first().map(String::as_str).unwrap_or_default();
        let caption = args.get(1).map(String::as_str).unwrap_or_default();
        let metric = args.get(2).map(String::as_str);
        let label = format!("image:{}:{}", chapter.id(), id);
        let image = chapter
            .image(id)
            .ok_or_else(|| StrategyError::render(format!("unknown image: {id}")))?;

        match &image.path {
            Some(path) => {
                let path = path.display().to_string();
                self.puts("\\begin{reviewimage}");
                match metric {
                    Some(metric) => self.puts(&format!("\\includegraphics[{metric}]{{{path}}}")),
                    None => self.puts(&macro_call("includegraphics", &[&path])),
                }
                self.puts(&macro_call("label", &[&label]));
                if !caption.is_empty() {
                    self.puts(&macro_call("caption", &[&escape(caption)]));
                }
                self.puts("\\end{reviewimage}");
            }
            None => {
                debug!(id, "image not bound, writing placeholder");
                self.puts("\\begin{reviewdummyimage}");
                self.puts("\\begin{verbatim}");
                self.puts(&format!("--[[path = {id} (not exist)]]--"));
                for line in lines {
                    self.puts(&detab(strip_end(line)));
                }
                self.puts("\\end{verbatim}");
                self.puts(&macro_call("label", &[&label]));
                self.puts(&escape(caption));
                self.puts("\\end{reviewdummyimage}");
            }
        }
        Ok(())
    }
}

impl Strategy for LatexStrategy {
    fn configure(&mut self, config: &Config) {
        self.secnolevel = config.secnolevel;
    }

    fn bind(&mut self, _chapter: &dyn DocumentContext) {
        self.out.clear();
        self.blank_needed = false;
    }

    fn headline(&mut self, level: usize, _label: Option<&str>, caption: &str) {
        let idx = level.clamp(1, HEADLINE.len()) - 1;
        let mut name = HEADLINE[idx].to_string();
        if level > self.secnolevel {
            name.push('*');
        }
        if !self.out.is_empty() {
            self.blank();
        }
        self.puts(&macro_call(&name, &[caption]));
    }

    fn supports_tagged_section(&self, tag: &str) -> bool {
        tag == "column"
    }

    fn tagged_section_begin(
        &mut self,
        tag: &str,
        _level: usize,
        label: Option<&str>,
        caption: &str,
    ) -> StrategyResult {
        if tag != "column" {
            return Err(StrategyError::Unsupported);
        }
        self.blank();
        self.puts("\\begin{reviewcolumn}");
        self.puts(&macro_call("reviewcolumnhead", &[label.unwrap_or_default(), caption]));
        Ok(())
    }

    fn tagged_section_end(&mut self, tag: &str, _level: usize) -> StrategyResult {
        if tag != "column" {
            return Err(StrategyError::Unsupported);
        }
        self.puts("\\end{reviewcolumn}");
        self.blank();
        Ok(())
    }

    fn ul_begin(&mut self) {
        self.blank();
        self.puts("\\begin{itemize}");
    }

    fn ul_item(&mut self, lines: &[String]) {
        self.puts(&format!("\\item {}", lines.join("\n")));
    }

    fn ul_end(&mut self) {
        self.puts("\\end{itemize}");
        self.blank();
    }

    fn ol_begin(&mut self) {
        self.blank();
        self.puts("\\begin{enumerate}");
    }

    fn ol_item(&mut self, lines: &[String], _number: &str) {
        self.puts(&format!("\\item {}", lines.join("\n")));
    }

    fn ol_end(&mut self) {
        self.puts("\\end{enumerate}");
        self.blank();
    }

    fn choice_multi_begin(&mut self) {
        self.ul_begin();
    }

    fn choice_multi_end(&mut self) {
        self.ul_end();
    }

    fn choice_single_begin(&mut self) {
        self.ul_begin();
    }

    fn choice_single_end(&mut self) {
        self.ul_end();
    }

    fn dl_begin(&mut self) {
        self.blank();
        self.puts("\\begin{description}");
    }

    fn dt(&mut self, term: &str) {
        self.puts(&format!("\\item[{term}] \\mbox{{}} \\\\"));
    }

    fn dd(&mut self, lines: &[String]) {
        self.puts_all(lines);
    }

    fn dl_end(&mut self) {
        self.puts("\\end{description}");
        self.blank();
    }

    fn paragraph(&mut self, lines: &[String]) {
        self.blank();
        self.puts_all(lines);
        self.blank();
    }

    fn supports_command(&self, name: &str) -> bool {
        BLOCK_COMMANDS.contains(&name) || SINGLE_COMMANDS.contains(&name)
    }

    fn block_command(
        &mut self,
        chapter: &dyn DocumentContext,
        name: &str,
        body: &[String],
        args: &[String],
    ) -> StrategyResult {
        match name {
            "read" | "lead" | "quote" => self.environment("quotation", body),
            "flushright" => self.environment("flushright", body),
            "emlist" | "emlistnum" => {
                self.blank();
                self.verbatim("reviewemlist", body, name == "emlistnum");
                self.blank();
            }
            "cmd" => {
                self.blank();
                self.verbatim("reviewcmd", body, false);
                self.blank();
            }
            "list" => return self.code_list(chapter, body, args, false),
            "listnum" => return self.code_list(chapter, body, args, true),
            "table" => return self.table(chapter, body, args),
            "image" => return self.image(chapter, body, args),
            "memo" | "note" => self.minicolumn(body, args.first().map(String::as_str)),
            _ => return Err(StrategyError::Unsupported),
        }
        Ok(())
    }

    fn single_command(
        &mut self,
        _chapter: &dyn DocumentContext,
        name: &str,
        args: &[String],
    ) -> StrategyResult {
        let first = args.first().map(String::as_str).unwrap_or_default();
        match name {
            "comment" => self.puts(&format!("% {first}")),
            "label" => self.puts(&macro_call("label", &[first])),
            "pagebreak" => self.puts("\\pagebreak"),
            "linebreak" => self.puts("\\\\"),
            "noindent" => self.puts("\\noindent"),
            "parasep" => self.puts("\\parasep"),
            "hr" => self.puts("\\hrule"),
            // Footnote text is emitted where @<fn> references it.
            "footnote" | "tsize" => {}
            _ => return Err(StrategyError::Unsupported),
        }
        Ok(())
    }

    fn supports_inline(&self, op: &str) -> bool {
        INLINE_OPS.contains(&op)
    }

    fn inline(
        &mut self,
        chapter: &dyn DocumentContext,
        op: &str,
        arg: &str,
    ) -> StrategyResult<String> {
        let rendered = match op {
            "list" => macro_call("reviewlistref", &[&list_number(chapter, arg)?]),
            "table" => macro_call("reviewtableref", &[&table_number(chapter, arg)?]),
            "img" => macro_call("reviewimageref", &[&image_number(chapter, arg)?]),
            "fn" => {
                let footnote = chapter
                    .footnote(arg)
                    .ok_or_else(|| StrategyError::render(format!("unknown footnote: {arg}")))?;
                macro_call("footnote", &[&escape(footnote.content.trim())])
            }
            "bou" => {
                let dot = macro_call("textgt", &[BOUTEN]);
                arg.chars()
                    .map(|c| macro_call("ruby", &[&escape(&c.to_string()), &dot]))
                    .collect::<Vec<_>>()
                    .join("\\allowbreak")
            }
            "ruby" => {
                let (base, ruby) = split_pair(arg);
                macro_call("ruby", &[&escape(base), &escape(ruby.unwrap_or_default())])
            }
            "b" | "strong" => macro_call("textbf", &[&escape(arg)]),
            "em" => macro_call("emph", &[&escape(arg)]),
            "tt" | "code" => macro_call("texttt", &[&escape(arg)]),
            "i" => {
                let word = escape(arg);
                format!("{word}{}", macro_call("index", &[&word]))
            }
            "kw" => {
                let (word, alt) = split_pair(arg);
                let word = macro_call("textgt", &[&escape(word)]);
                match alt {
                    Some(alt) => format!("{word}（{}）", escape(alt)),
                    None => word,
                }
            }
            "href" => {
                let (url, label) = split_pair(arg);
                if is_absolute_url(url) {
                    macro_call("href", &[url, &escape(label.unwrap_or(url))])
                } else {
                    macro_call("ref", &[url])
                }
            }
            "raw" => match raw_for(arg, "latex") {
                RawContent::Verbatim(text) => text.to_string(),
                RawContent::Plain(text) => escape(text),
                RawContent::Skip => String::new(),
            },
            _ => return Err(StrategyError::Unsupported),
        };
        Ok(rendered)
    }

    fn nofunc_text(&mut self, text: &str) -> String {
        escape(text)
    }

    fn result(&mut self) -> String {
        self.blank_needed = false;
        std::mem::take(&mut self.out)
    }
}

/// `scheme://...` with a lowercase scheme.
fn is_absolute_url(url: &str) -> bool {
    url.split_once("://")
        .is_some_and(|(scheme, _)| !scheme.is_empty() && scheme.bytes().all(|b| b.is_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Chapter;
    use crate::Compiler;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> String {
        let chapter = Chapter::new("ch01.re", Some(1), source);
        Compiler::new(LatexStrategy::new()).compile(&chapter).output
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("50% of $x_1"), "50\\% of \\textdollar{}x\\textunderscore{}1");
        assert_eq!(escape("{a}"), "\\{a\\}");
    }

    #[test]
    fn test_headlines_star_beyond_secnolevel() {
        let out = compile("= Intro\n\n== Part\n\n=== Detail\n");
        assert_eq!(
            out,
            "\\chapter{Intro}\n\n\\section{Part}\n\n\\subsection*{Detail}\n"
        );
    }

    #[test]
    fn test_paragraph_and_inline() {
        let out = compile("Use @<b>{bold} & @<tt>{mono}.\n");
        assert_eq!(out, "\nUse \\textbf{bold} \\& \\texttt{mono}.\n");
    }

    #[test]
    fn test_itemize() {
        let out = compile(" * one\n * two\n");
        assert_eq!(
            out,
            "\n\\begin{itemize}\n\\item one\n\\item two\n\\end{itemize}\n"
        );
    }

    #[test]
    fn test_list_block_and_reference() {
        let out = compile("//list[hello][Hello $]{\nputs \"$x\"\n//}\n\nSee @<list>{hello}.\n");
        assert_eq!(
            out,
            "\\reviewlistcaption{1.1}{Hello \\textdollar{}}\n\
             \\begin{reviewlist}\n\
             \\begin{verbatim}\n\
             puts \"$x\"\n\
             \\end{verbatim}\n\
             \\end{reviewlist}\n\
             \n\
             \n\
             See \\reviewlistref{1.1}.\n"
        );
    }

    #[test]
    fn test_table() {
        let out = compile("//table[t1][Data]{\nName\tValue\n------------\na\t1\n//}\n");
        assert_eq!(
            out,
            "\\reviewtablecaption{1.1}{Data}\n\
             \\begin{reviewtable}{|l|l|}\n\
             \\hline\n\
             \\textgt{Name} & \\textgt{Value} \\\\  \\hline\n\
             a & 1 \\\\  \\hline\n\
             \\end{reviewtable}\n"
        );
    }

    #[test]
    fn test_empty_table_is_error() {
        let chapter = Chapter::new("ch01.re", Some(1), "//table{\n//}\n");
        let result = Compiler::new(LatexStrategy::new()).compile(&chapter);
        let messages: Vec<_> = result.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["no rows in the table"]);
    }

    #[test]
    fn test_dummy_image_when_unbound() {
        let out = compile("//image[fig][A figure]{\n\tbox\n//}\n");
        assert!(out.contains("\\begin{reviewdummyimage}"));
        assert!(out.contains("--[[path = fig (not exist)]]--"));
        assert!(out.contains("        box"));
        assert!(out.contains("\\label{image:ch01:fig}"));
    }

    #[test]
    fn test_bound_image() {
        let chapter = Chapter::new("ch01.re", Some(1), "//image[fig][A figure][scale=0.5]{\n//}\n")
            .with_image_path("fig", "images/fig.png");
        let out = Compiler::new(LatexStrategy::new()).compile(&chapter).output;
        assert!(out.contains("\\includegraphics[scale=0.5]{images/fig.png}"));
        assert!(out.contains("\\caption{A figure}"));
    }

    #[test]
    fn test_column_section() {
        let out = compile("==[column]{c1} Aside\n\ntext\n");
        assert_eq!(
            out,
            "\n\\begin{reviewcolumn}\n\\reviewcolumnhead{c1}{Aside}\n\ntext\n\n\\end{reviewcolumn}\n"
        );
    }

    #[test]
    fn test_inline_ops() {
        let mut s = LatexStrategy::new();
        let chapter = Chapter::new("ch01.re", Some(3), "//footnote[n][Note _1_]\n");
        assert_eq!(
            s.inline(&chapter, "fn", "n").unwrap(),
            "\\footnote{Note \\textunderscore{}1\\textunderscore{}}"
        );
        assert_eq!(
            s.inline(&chapter, "kw", "API, interface").unwrap(),
            "\\textgt{API}（interface）"
        );
        assert_eq!(
            s.inline(&chapter, "href", "https://example.com, site").unwrap(),
            "\\href{https://example.com}{site}"
        );
        assert_eq!(s.inline(&chapter, "href", "sec1").unwrap(), "\\ref{sec1}");
        assert_eq!(
            s.inline(&chapter, "bou", "ab").unwrap(),
            "\\ruby{a}{\\textgt{・}}\\allowbreak\\ruby{b}{\\textgt{・}}"
        );
        assert_eq!(s.inline(&chapter, "raw", "|latex|\\LaTeX").unwrap(), "\\LaTeX");
        assert_eq!(s.inline(&chapter, "raw", "|html|<br>").unwrap(), "");
        assert!(matches!(
            s.inline(&chapter, "list", "missing"),
            Err(StrategyError::Render(_))
        ));
    }
}
