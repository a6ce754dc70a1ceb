//! HTML fragment output.

use super::{
    image_number, list_number, raw_for, split_pair, split_table, table_number, RawContent,
};
use crate::context::DocumentContext;
use crate::strategy::{Strategy, StrategyError, StrategyResult};

const BLOCK_COMMANDS: &[&str] = &[
    "read", "lead", "quote", "flushright", "emlist", "emlistnum", "cmd", "list", "listnum",
    "table", "image", "memo", "note",
];

const SINGLE_COMMANDS: &[&str] = &["comment", "label", "linebreak", "footnote", "hr"];

const INLINE_OPS: &[&str] = &[
    "b", "strong", "em", "i", "tt", "code", "kw", "href", "u", "del", "ins", "sup", "sub",
    "ruby", "list", "table", "img", "fn", "raw",
];

/// Escape `&`, `<`, `>` and `"`.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders a chapter as an HTML fragment.
#[derive(Debug, Default)]
pub struct HtmlStrategy {
    out: String,
}

impl HtmlStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn puts(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn caption(&mut self, prefix: &str, caption: &str) {
        if caption.is_empty() {
            self.puts(&format!(r#"<p class="caption">{prefix}</p>"#));
        } else {
            self.puts(&format!(
                r#"<p class="caption">{prefix}: {}</p>"#,
                escape_html(caption)
            ));
        }
    }

    /// `<pre>` around raw source lines.
    fn pre(&mut self, class: &str, lines: &[String], numbered: bool) {
        let escaped: Vec<String> = lines.iter().map(|line| escape_html(line)).collect();
        self.pre_resolved(class, &escaped, numbered);
    }

    /// `<pre>` around lines that were already rendered as HTML.
    fn pre_resolved(&mut self, class: &str, lines: &[String], numbered: bool) {
        self.puts(&format!(r#"<pre class="{class}">"#));
        for (i, line) in lines.iter().enumerate() {
            if numbered {
                self.puts(&format!("{:>2}: {line}", i + 1));
            } else {
                self.puts(line);
            }
        }
        self.puts("</pre>");
    }

    fn div(&mut self, class: &str, lines: &[String]) {
        self.puts(&format!(r#"<div class="{class}">"#));
        self.paragraph(lines);
        self.puts("</div>");
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

        self.puts(r#"<div class="table">"#);
        if let (Some(id), Some(caption)) = (args.first(), args.get(1)) {
            let number = table_number(chapter, id)?;
            self.caption(&format!("Table {number}"), caption);
        }
        self.puts("<table>");
        for row in &rows.header {
            let cells: String = row.iter().map(|c| format!("<th>{c}</th>")).collect();
            self.puts(&format!("<tr>{cells}</tr>"));
        }
        for row in &rows.body {
            let cells: String = row.iter().map(|c| format!("<td>{c}</td>")).collect();
            self.puts(&format!("<tr>{cells}</tr>"));
        }
        self.puts("</table>");
        self.puts("</div>");
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
        let image = chapter
            .image(id)
            .ok_or_else(|| StrategyError::render(format!("unknown image: {id}")))?;
        let number = image_number(chapter, id)?;

        self.puts(&format!(r#"<div id="{}" class="image">"#, escape_html(id)));
        match &image.path {
            Some(path) => self.puts(&format!(
                r#"<img src="{}" alt="{}" />"#,
                escape_html(&path.display().to_string()),
                escape_html(caption)
            )),
            None => self.pre_resolved("dummyimage", lines, false),
        }
        self.caption(&format!("Figure {number}"), caption);
        self.puts("</div>");
        Ok(())
    }
}

impl Strategy for HtmlStrategy {
    fn bind(&mut self, _chapter: &dyn DocumentContext) {
        self.out.clear();
    }

    fn headline(&mut self, level: usize, label: Option<&str>, caption: &str) {
        if level > 1 {
            self.out.push('\n');
        }
        match label {
            Some(label) => self.puts(&format!(
                "<h{level} id='{}'>{caption}</h{level}>",
                escape_html(label)
            )),
            None => self.puts(&format!("<h{level}>{caption}</h{level}>")),
        }
    }

    fn supports_tagged_section(&self, tag: &str) -> bool {
        tag == "column"
    }

    fn tagged_section_begin(
        &mut self,
        tag: &str,
        level: usize,
        label: Option<&str>,
        caption: &str,
    ) -> StrategyResult {
        if tag != "column" {
            return Err(StrategyError::Unsupported);
        }
        self.puts(r#"<div class="column">"#);
        self.headline(level, label, caption);
        Ok(())
    }

    fn tagged_section_end(&mut self, tag: &str, _level: usize) -> StrategyResult {
        if tag != "column" {
            return Err(StrategyError::Unsupported);
        }
        self.puts("</div>");
        Ok(())
    }

    fn ul_begin(&mut self) {
        self.puts("<ul>");
    }

    fn ul_item(&mut self, lines: &[String]) {
        self.puts(&format!("<li>{}</li>", lines.join("\n")));
    }

    fn ul_end(&mut self) {
        self.puts("</ul>");
    }

    fn ol_begin(&mut self) {
        self.puts("<ol>");
    }

    fn ol_item(&mut self, lines: &[String], number: &str) {
        self.puts(&format!(
            r#"<li value="{number}">{}</li>"#,
            lines.join("\n")
        ));
    }

    fn ol_end(&mut self) {
        self.puts("</ol>");
    }

    fn choice_multi_begin(&mut self) {
        self.puts(r#"<ul class="choice-multi">"#);
    }

    fn choice_multi_end(&mut self) {
        self.puts("</ul>");
    }

    fn choice_single_begin(&mut self) {
        self.puts(r#"<ul class="choice-single">"#);
    }

    fn choice_single_end(&mut self) {
        self.puts("</ul>");
    }

    fn dl_begin(&mut self) {
        self.puts("<dl>");
    }

    fn dt(&mut self, term: &str) {
        self.puts(&format!("<dt>{term}</dt>"));
    }

    fn dd(&mut self, lines: &[String]) {
        self.puts(&format!("<dd>{}</dd>", lines.join("\n")));
    }

    fn dl_end(&mut self) {
        self.puts("</dl>");
    }

    fn paragraph(&mut self, lines: &[String]) {
        self.puts(&format!("<p>{}</p>", lines.join("\n")));
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
        let first = args.first().map(String::as_str);
        match name {
            "read" | "lead" => self.div("lead", body),
            "flushright" => self.div("flushright", body),
            "quote" => {
                self.puts("<blockquote>");
                self.paragraph(body);
                self.puts("</blockquote>");
            }
            "emlist" | "emlistnum" | "cmd" => {
                let class = if name == "cmd" { "cmd" } else { "emlist" };
                self.puts(&format!(r#"<div class="{class}-code">"#));
                if let Some(caption) = first {
                    self.puts(&format!(r#"<p class="caption">{}</p>"#, escape_html(caption)));
                }
                self.pre(class, body, name == "emlistnum");
                self.puts("</div>");
            }
            "list" | "listnum" => {
                let id = first.unwrap_or_default();
                let number = list_number(chapter, id)?;
                let caption = args.get(1).map(String::as_str).unwrap_or_default();
                self.puts(r#"<div class="caption-code">"#);
                self.caption(&format!("List {number}"), caption);
                self.pre("list", body, name == "listnum");
                self.puts("</div>");
            }
            "table" => return self.table(chapter, body, args),
            "image" => return self.image(chapter, body, args),
            "memo" | "note" => {
                self.puts(&format!(r#"<div class="{name}">"#));
                if let Some(caption) = first {
                    self.puts(&format!(r#"<p class="caption">{}</p>"#, escape_html(caption)));
                }
                self.paragraph(body);
                self.puts("</div>");
            }
            _ => return Err(StrategyError::Unsupported),
        }
        Ok(())
    }

    fn single_command(
        &mut self,
        chapter: &dyn DocumentContext,
        name: &str,
        args: &[String],
    ) -> StrategyResult {
        let first = args.first().map(String::as_str).unwrap_or_default();
        match name {
            "comment" => self.puts(&format!(
                "<!-- {} -->",
                escape_html(first).replace("--", "- -")
            )),
            "label" => self.puts(&format!(r#"<a id="{}"></a>"#, escape_html(first))),
            "linebreak" => self.puts("<br />"),
            "hr" => self.puts("<hr />"),
            "footnote" => {
                let number = chapter.footnote(first).map_or(0, |f| f.number);
                let text = args.get(1).map(String::as_str).unwrap_or_default();
                self.puts(&format!(
                    r#"<div class="footnote"><p class="footnote">[<a id="fn-{}">*{number}</a>] {}</p></div>"#,
                    escape_html(first),
                    escape_html(text)
                ));
            }
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
        let tag = |name: &str| format!("<{name}>{}</{name}>", escape_html(arg));
        let rendered = match op {
            "b" | "strong" | "em" | "i" | "tt" | "code" | "u" | "del" | "ins" | "sup" | "sub" => {
                tag(op)
            }
            "kw" => {
                let (word, alt) = split_pair(arg);
                match alt {
                    Some(alt) => format!(
                        r#"<b class="kw">{} ({})</b>"#,
                        escape_html(word),
                        escape_html(alt)
                    ),
                    None => format!(r#"<b class="kw">{}</b>"#, escape_html(word)),
                }
            }
            "href" => {
                let (url, label) = split_pair(arg);
                format!(
                    r#"<a href="{}" class="link">{}</a>"#,
                    escape_html(url),
                    escape_html(label.unwrap_or(url))
                )
            }
            "ruby" => {
                let (base, ruby) = split_pair(arg);
                format!(
                    "<ruby><rb>{}</rb><rp>(</rp><rt>{}</rt><rp>)</rp></ruby>",
                    escape_html(base),
                    escape_html(ruby.unwrap_or_default())
                )
            }
            "list" => format!("List {}", list_number(chapter, arg)?),
            "table" => format!("Table {}", table_number(chapter, arg)?),
            "img" => format!("Figure {}", image_number(chapter, arg)?),
            "fn" => {
                let footnote = chapter
                    .footnote(arg)
                    .ok_or_else(|| StrategyError::render(format!("unknown footnote: {arg}")))?;
                format!(
                    r##"<a href="#fn-{}" class="noteref">*{}</a>"##,
                    escape_html(arg),
                    footnote.number
                )
            }
            "raw" => match raw_for(arg, "html") {
                RawContent::Verbatim(text) => text.to_string(),
                RawContent::Plain(text) => escape_html(text),
                RawContent::Skip => String::new(),
            },
            _ => return Err(StrategyError::Unsupported),
        };
        Ok(rendered)
    }

    fn nofunc_text(&mut self, text: &str) -> String {
        escape_html(text)
    }

    fn result(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Chapter;
    use crate::Compiler;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> String {
        let chapter = Chapter::new("ch01.re", Some(1), source);
        Compiler::new(HtmlStrategy::new()).compile(&chapter).output
    }

    #[test]
    fn test_headline_level1() {
        let mut s = HtmlStrategy::new();
        s.headline(1, Some("test"), "this is test.");
        assert_eq!(s.result(), "<h1 id='test'>this is test.</h1>\n");
    }

    #[test]
    fn test_headline_level2_and_3() {
        let mut s = HtmlStrategy::new();
        s.headline(2, Some("test"), "this is test.");
        assert_eq!(s.result(), "\n<h2 id='test'>this is test.</h2>\n");
        s.headline(3, Some("test"), "this is test.");
        assert_eq!(s.result(), "\n<h3 id='test'>this is test.</h3>\n");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("a<>b&c\\de. xyz[]123."),
            "a&lt;&gt;b&amp;c\\de. xyz[]123."
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut s = HtmlStrategy::new();
        assert_eq!(s.nofunc_text("abcde. xyz123."), "abcde. xyz123.");
    }

    #[test]
    fn test_document() {
        let out = compile("={intro} Intro\n\nA <b>@<b>{bold}</b> word.\n\n : no\n\n * one\n * two\n");
        assert_eq!(
            out,
            "<h1 id='intro'>Intro</h1>\n\
             <p>A &lt;b&gt;<b>bold</b>&lt;/b&gt; word.</p>\n\
             <p>: no</p>\n\
             <ul>\n\
             <li>one</li>\n\
             <li>two</li>\n\
             </ul>\n"
        );
    }

    #[test]
    fn test_preformatted_body_is_escaped() {
        let out = compile("//emlist[Example]{\nif a < b && c {\n//}\n");
        assert_eq!(
            out,
            "<div class=\"emlist-code\">\n\
             <p class=\"caption\">Example</p>\n\
             <pre class=\"emlist\">\n\
             if a &lt; b &amp;&amp; c {\n\
             </pre>\n\
             </div>\n"
        );
    }

    #[test]
    fn test_table_and_references() {
        let out = compile(
            "//table[t][Numbers]{\nA\tB\n============\n1\t2\n//}\n\nSee @<table>{t}.\n",
        );
        assert_eq!(
            out,
            "<div class=\"table\">\n\
             <p class=\"caption\">Table 1.1: Numbers</p>\n\
             <table>\n\
             <tr><th>A</th><th>B</th></tr>\n\
             <tr><td>1</td><td>2</td></tr>\n\
             </table>\n\
             </div>\n\
             <p>See Table 1.1.</p>\n"
        );
    }

    #[test]
    fn test_dummy_image_body_escaped_once() {
        let out = compile("//image[fig][cap]{\na & b\n//}\n");
        assert_eq!(
            out,
            "<div id=\"fig\" class=\"image\">\n\
             <pre class=\"dummyimage\">\n\
             a &amp; b\n\
             </pre>\n\
             <p class=\"caption\">Figure 1.1: cap</p>\n\
             </div>\n"
        );
    }

    #[test]
    fn test_column_wraps_headline() {
        let out = compile("==[column] Note\n\nbody\n\n== Next\n");
        assert_eq!(
            out,
            "<div class=\"column\">\n\n<h2>Note</h2>\n<p>body</p>\n</div>\n\n<h2>Next</h2>\n"
        );
    }

    #[test]
    fn test_inline_ops() {
        let mut s = HtmlStrategy::new();
        let chapter = Chapter::new("ch01.re", Some(2), "//footnote[f1][x]\n");
        assert_eq!(
            s.inline(&chapter, "fn", "f1").unwrap(),
            "<a href=\"#fn-f1\" class=\"noteref\">*1</a>"
        );
        assert_eq!(
            s.inline(&chapter, "href", "https://example.com").unwrap(),
            "<a href=\"https://example.com\" class=\"link\">https://example.com</a>"
        );
        assert_eq!(s.inline(&chapter, "raw", "|html|<br>").unwrap(), "<br>");
        assert_eq!(s.inline(&chapter, "sup", "2").unwrap(), "<sup>2</sup>");
    }
}
