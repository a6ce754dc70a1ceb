//! Inline markup: `@<op>{argument}` spans inside a line of text.
//!
//! A text run is split into alternating literal and command fragments. A
//! literal is rendered with [`Strategy::nofunc_text`]; a command is handed to
//! [`Strategy::inline`]. A command that cannot be resolved is reported and
//! rendered as literal text, so one bad span never loses the rest of the line.

use std::borrow::Cow;

use memchr::memmem;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::context::DocumentContext;
use crate::error::InlineError;
use crate::strategy::{Strategy, StrategyError};
use crate::syntax::SyntaxRegistry;

/// A complete inline command; `\}` inside the argument does not close it.
static INLINE_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@<(\w+)>\{((?:[^}\\]+|\\.)*)\}").expect("inline command pattern is valid")
});

/// Any inline marker, complete or not.
static INLINE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@<\w+>").expect("inline marker pattern is valid"));

/// One fragment of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineSpan<'a> {
    Literal(&'a str),
    Command {
        op: &'a str,
        /// Argument as written, still escaped.
        arg: &'a str,
        /// The whole `@<op>{...}` fragment.
        raw: &'a str,
    },
}

impl<'a> InlineSpan<'a> {
    /// Source text of the fragment.
    pub fn source(&self) -> &'a str {
        match *self {
            InlineSpan::Literal(text) => text,
            InlineSpan::Command { raw, .. } => raw,
        }
    }
}

/// Replace `\}` with `}`.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if s.contains("\\}") {
        Cow::Owned(s.replace("\\}", "}"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Split text into fragments.
///
/// The result always starts and ends with a literal (possibly empty) and
/// alternates literal, command, literal.
pub fn split(text: &str) -> Vec<InlineSpan<'_>> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in INLINE_COMMAND.captures_iter(text) {
        let (Some(whole), Some(op), Some(arg)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        spans.push(InlineSpan::Literal(&text[last..whole.start()]));
        spans.push(InlineSpan::Command {
            op: op.as_str(),
            arg: arg.as_str(),
            raw: whole.as_str(),
        });
        last = whole.end();
    }
    spans.push(InlineSpan::Literal(&text[last..]));
    spans
}

/// A fragment with several markers is probably a command with an unescaped
/// `}`; `@<raw>` is exempt since its argument is passed through verbatim.
fn is_suspicious(fragment: &str) -> bool {
    !fragment.starts_with("@<raw>") && INLINE_MARKER.find_iter(fragment).nth(1).is_some()
}

/// Resolve every inline command in `text` and render the result.
///
/// Problems are passed to `report` as error messages; resolution continues.
pub fn resolve<S>(
    text: &str,
    registry: &SyntaxRegistry,
    strategy: &mut S,
    chapter: &dyn DocumentContext,
    report: &mut dyn FnMut(String),
) -> String
where
    S: Strategy + ?Sized,
{
    if text.is_empty() {
        return String::new();
    }
    if memmem::find(text.as_bytes(), b"@<").is_none() {
        return strategy.nofunc_text(text);
    }

    let spans = split(text);
    for span in &spans {
        let fragment = span.source();
        if is_suspicious(fragment) {
            report(format!(
                "`@<xxx>' seen but is not valid inline op: {fragment}"
            ));
        }
    }

    let mut out = String::with_capacity(text.len());
    for span in spans {
        match span {
            InlineSpan::Literal(literal) => out.push_str(&strategy.nofunc_text(literal)),
            InlineSpan::Command { op, arg, raw } => {
                let arg = unescape(arg);
                match dispatch(op, &arg, registry, strategy, chapter) {
                    Ok(rendered) => out.push_str(&rendered),
                    Err(err) => {
                        report(err.to_string());
                        out.push_str(&strategy.nofunc_text(&unescape(raw)));
                    }
                }
            }
        }
    }
    out
}

fn dispatch<S>(
    op: &str,
    arg: &str,
    registry: &SyntaxRegistry,
    strategy: &mut S,
    chapter: &dyn DocumentContext,
) -> Result<String, InlineError>
where
    S: Strategy + ?Sized,
{
    if !registry.is_inline(op) {
        return Err(InlineError::UnknownOp(op.to_string()));
    }
    if !strategy.supports_inline(op) {
        return Err(InlineError::Unsupported(op.to_string()));
    }
    trace!(op, arg, "inline");
    strategy.inline(chapter, op, arg).map_err(|err| match err {
        StrategyError::Unsupported => InlineError::Unsupported(op.to_string()),
        StrategyError::Render(message) => InlineError::Render(message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Chapter;

    /// Renders `@<b>` as `*arg*`, brackets literals.
    #[derive(Default)]
    struct Bold;

    impl Strategy for Bold {
        fn headline(&mut self, _: usize, _: Option<&str>, _: &str) {}
        fn paragraph(&mut self, _: &[String]) {}

        fn supports_inline(&self, op: &str) -> bool {
            matches!(op, "b" | "raw" | "fn")
        }

        fn inline(
            &mut self,
            chapter: &dyn DocumentContext,
            op: &str,
            arg: &str,
        ) -> Result<String, StrategyError> {
            match op {
                "b" => Ok(format!("*{arg}*")),
                "raw" => Ok(arg.to_string()),
                "fn" => chapter
                    .footnote(arg)
                    .map(|f| format!("[^{}]", f.number))
                    .ok_or_else(|| StrategyError::render(format!("unknown footnote: {arg}"))),
                _ => Err(StrategyError::Unsupported),
            }
        }

        fn nofunc_text(&mut self, text: &str) -> String {
            format!("<{text}>")
        }

        fn result(&mut self) -> String {
            String::new()
        }
    }

    fn run(text: &str) -> (String, Vec<String>) {
        let chapter = Chapter::new("t.re", Some(1), "//footnote[n1][note]\n");
        let mut errors = Vec::new();
        let out = resolve(
            text,
            SyntaxRegistry::standard(),
            &mut Bold,
            &chapter,
            &mut |msg| errors.push(msg),
        );
        (out, errors)
    }

    #[test]
    fn test_split_alternates() {
        let spans = split("a @<b>{x} c @<i>{y}");
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[0], InlineSpan::Literal("a "));
        assert_eq!(
            spans[1],
            InlineSpan::Command { op: "b", arg: "x", raw: "@<b>{x}" }
        );
        assert_eq!(spans[2], InlineSpan::Literal(" c "));
        assert_eq!(spans[4], InlineSpan::Literal(""));
    }

    #[test]
    fn test_marker_free_text_is_one_literal() {
        assert_eq!(split("plain text {}"), vec![InlineSpan::Literal("plain text {}")]);
        assert_eq!(run("plain"), ("<plain>".to_string(), vec![]));
        assert_eq!(run(""), (String::new(), vec![]));
    }

    #[test]
    fn test_escaped_brace_reaches_strategy_unescaped() {
        let spans = split(r"@<b>{a\}b}");
        assert_eq!(spans.len(), 3);
        let (out, errors) = run(r"x @<b>{a\}b} y");
        assert_eq!(out, "<x >*a}b*< y>");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_unknown_op_falls_back_to_text() {
        let (out, errors) = run("see @<nope>{x}.");
        assert_eq!(out, "<see ><@<nope>{x}><.>");
        assert_eq!(errors, ["no such inline op: nope"]);
    }

    #[test]
    fn test_unsupported_op() {
        let (out, errors) = run("@<tt>{code}");
        assert_eq!(out, "<><@<tt>{code}><>");
        assert_eq!(errors, ["strategy does not support inline op: @<tt>"]);
    }

    #[test]
    fn test_render_error_is_reported() {
        let (out, errors) = run("@<fn>{n1} @<fn>{n2}");
        assert_eq!(out, "<>[^1]< ><@<fn>{n2}><>");
        assert_eq!(errors, ["unknown footnote: n2"]);
    }

    #[test]
    fn test_several_markers_in_one_fragment_reported() {
        let (out, errors) = run("@<b>{x @<i>{y}");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("`@<xxx>' seen but is not valid inline op: "));
        // Still resolved.
        assert_eq!(out, "<>*x @<i>{y*<>");

        let (_, errors) = run("@<raw>{@<b>{x\\}}");
        assert!(errors.is_empty());
    }
}
