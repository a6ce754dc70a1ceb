//! Bundled output strategies.
//!
//! Both strategies accumulate output in a `String` and reset it on
//! [`Strategy::bind`](crate::Strategy::bind). Captions passed as command
//! arguments are escaped, not inline-resolved; body lines arrive already
//! resolved except for preformatted commands.

pub mod html;
pub mod latex;

pub use html::HtmlStrategy;
pub use latex::LatexStrategy;

use crate::context::DocumentContext;
use crate::scanner::strip;
use crate::strategy::StrategyError;

/// `CHAPTER.N` as used in list, table and image references.
pub(crate) fn ref_number(chapter: &dyn DocumentContext, number: usize) -> String {
    format!("{}.{}", chapter.number_label(), number)
}

pub(crate) fn list_number(chapter: &dyn DocumentContext, id: &str) -> Result<String, StrategyError> {
    chapter
        .list(id)
        .map(|item| ref_number(chapter, item.number))
        .ok_or_else(|| StrategyError::render(format!("unknown list: {id}")))
}

pub(crate) fn table_number(chapter: &dyn DocumentContext, id: &str) -> Result<String, StrategyError> {
    chapter
        .table(id)
        .map(|item| ref_number(chapter, item.number))
        .ok_or_else(|| StrategyError::render(format!("unknown table: {id}")))
}

pub(crate) fn image_number(chapter: &dyn DocumentContext, id: &str) -> Result<String, StrategyError> {
    chapter
        .image(id)
        .map(|item| ref_number(chapter, item.number))
        .ok_or_else(|| StrategyError::render(format!("unknown image: {id}")))
}

/// Split `word, alternative` at the first comma.
pub(crate) fn split_pair(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once(',') {
        Some((first, second)) => (strip(first), Some(strip(second))),
        None => (strip(arg), None),
    }
}

/// `|latex|text` is passed through for `latex` only; text without a format
/// selector belongs to every format and is escaped by the caller.
pub(crate) enum RawContent<'a> {
    Verbatim(&'a str),
    Plain(&'a str),
    Skip,
}

pub(crate) fn raw_for<'a>(arg: &'a str, format: &str) -> RawContent<'a> {
    let Some(rest) = arg.strip_prefix('|') else {
        return RawContent::Plain(arg);
    };
    match rest.split_once('|') {
        Some((formats, content)) if formats.split(',').any(|f| strip(f) == format) => {
            RawContent::Verbatim(content)
        }
        Some(_) => RawContent::Skip,
        None => RawContent::Plain(arg),
    }
}

/// Rows of a `//table` body with the header/body split applied.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TableRows {
    pub header: Vec<Vec<String>>,
    pub body: Vec<Vec<String>>,
    pub columns: usize,
}

/// Split tab-separated lines into cells.
///
/// A line starting with twelve `-` or `=` marks the end of the header rows.
/// A cell consisting of `.` alone (or starting with `.`) loses the dot so
/// empty cells can be written. Short rows are padded.
pub(crate) fn split_table(lines: &[String]) -> TableRows {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut separator = None;

    for line in lines {
        if is_table_separator(line) {
            separator.get_or_insert(rows.len());
            continue;
        }
        let cells = strip(line)
            .split('\t')
            .filter(|cell| !cell.is_empty())
            .map(|cell| cell.strip_prefix('.').unwrap_or(cell).to_string())
            .collect();
        rows.push(cells);
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(columns, String::new());
    }

    let body = match separator {
        Some(idx) => rows.split_off(idx),
        None => std::mem::take(&mut rows),
    };
    TableRows {
        header: rows,
        body,
        columns,
    }
}

fn is_table_separator(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 12 && bytes[..12].iter().all(|&b| b == b'-' || b == b'=')
}

/// Expand tabs to 8-column stops.
pub(crate) fn detab(line: &str) -> String {
    const WIDTH: usize = 8;
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = WIDTH - col % WIDTH;
            out.extend(std::iter::repeat(' ').take(pad));
            col += pad;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_table_with_header() {
        let rows = split_table(&lines(&[
            "Name\tValue",
            "------------",
            "a\t\t1",
            "b",
            "c\t.",
        ]));
        assert_eq!(rows.columns, 2);
        assert_eq!(rows.header, vec![vec!["Name", "Value"]]);
        assert_eq!(
            rows.body,
            vec![vec!["a", "1"], vec!["b", ""], vec!["c", ""]]
        );
    }

    #[test]
    fn test_split_table_without_header() {
        let rows = split_table(&lines(&["x\ty"]));
        assert!(rows.header.is_empty());
        assert_eq!(rows.body.len(), 1);
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("API, Application Interface"), ("API", Some("Application Interface")));
        assert_eq!(split_pair("word"), ("word", None));
    }

    #[test]
    fn test_raw_for() {
        assert!(matches!(raw_for("|latex|\\LaTeX", "latex"), RawContent::Verbatim("\\LaTeX")));
        assert!(matches!(raw_for("|html,latex|x", "latex"), RawContent::Verbatim("x")));
        assert!(matches!(raw_for("|html|<br>", "latex"), RawContent::Skip));
        assert!(matches!(raw_for("plain", "latex"), RawContent::Plain("plain")));
    }

    #[test]
    fn test_detab() {
        assert_eq!(detab("a\tb"), "a       b");
        assert_eq!(detab("\tx"), "        x");
    }
}
