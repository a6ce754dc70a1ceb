//! The interface between the compiler and an output format.
//!
//! A strategy receives one call per recognised construct, already split into
//! lines and with inline markup resolved. Optional capabilities are probed
//! with the `supports_*` methods before use; everything except headlines,
//! paragraphs, literal text and the final result has a default body, so a
//! minimal strategy only implements those four.

use thiserror::Error;
use tracing::{error, warn};

use crate::config::Config;
use crate::context::DocumentContext;
use crate::error::Diagnostic;

/// Why a strategy could not handle a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// The capability is not implemented by this strategy.
    #[error("unsupported")]
    Unsupported,
    /// The capability exists but rejected this input.
    #[error("{0}")]
    Render(String),
}

impl StrategyError {
    pub fn render(message: impl Into<String>) -> Self {
        StrategyError::Render(message.into())
    }
}

pub type StrategyResult<T = ()> = Result<T, StrategyError>;

pub trait Strategy {
    /// Receive compile parameters. Called once per `Compiler` configuration.
    fn configure(&mut self, _config: &Config) {}

    /// Start a new chapter. Per-chapter output state is reset here.
    fn bind(&mut self, _chapter: &dyn DocumentContext) {}

    fn headline(&mut self, level: usize, label: Option<&str>, caption: &str);

    fn supports_tagged_section(&self, _tag: &str) -> bool {
        false
    }

    fn tagged_section_begin(
        &mut self,
        _tag: &str,
        _level: usize,
        _label: Option<&str>,
        _caption: &str,
    ) -> StrategyResult {
        Err(StrategyError::Unsupported)
    }

    fn tagged_section_end(&mut self, _tag: &str, _level: usize) -> StrategyResult {
        Err(StrategyError::Unsupported)
    }

    fn ul_begin(&mut self) {}

    /// One bullet item; by default rendered as a paragraph.
    fn ul_item(&mut self, lines: &[String]) {
        self.paragraph(lines);
    }

    fn ul_end(&mut self) {}

    fn ol_begin(&mut self) {}

    /// One numbered item; `number` is the digits as written in the source.
    fn ol_item(&mut self, lines: &[String], _number: &str) {
        self.paragraph(lines);
    }

    fn ol_end(&mut self) {}

    /// Items of a multiple-choice run arrive through `ul_item`.
    fn choice_multi_begin(&mut self) {}

    fn choice_multi_end(&mut self) {}

    /// Items of a single-choice run arrive through `ul_item`.
    fn choice_single_begin(&mut self) {}

    fn choice_single_end(&mut self) {}

    fn dl_begin(&mut self) {}

    fn dt(&mut self, term: &str) {
        self.paragraph(&[term.to_string()]);
    }

    fn dd(&mut self, lines: &[String]) {
        self.paragraph(lines);
    }

    fn dl_end(&mut self) {}

    fn paragraph(&mut self, lines: &[String]);

    /// Whether `//name` is handled by `block_command` or `single_command`.
    fn supports_command(&self, _name: &str) -> bool {
        false
    }

    fn block_command(
        &mut self,
        _chapter: &dyn DocumentContext,
        _name: &str,
        _body: &[String],
        _args: &[String],
    ) -> StrategyResult {
        Err(StrategyError::Unsupported)
    }

    fn single_command(
        &mut self,
        _chapter: &dyn DocumentContext,
        _name: &str,
        _args: &[String],
    ) -> StrategyResult {
        Err(StrategyError::Unsupported)
    }

    /// A command that is not registered, or that this strategy cannot handle.
    fn unknown_command(&mut self, _args: &[String], _body: Option<&[String]>) {}

    fn supports_inline(&self, _op: &str) -> bool {
        false
    }

    fn inline(
        &mut self,
        _chapter: &dyn DocumentContext,
        _op: &str,
        _arg: &str,
    ) -> StrategyResult<String> {
        Err(StrategyError::Unsupported)
    }

    /// Render literal text, escaping as the format requires.
    fn nofunc_text(&mut self, text: &str) -> String;

    fn warn(&mut self, diagnostic: &Diagnostic) {
        warn!(location = %diagnostic.location, "{}", diagnostic.message);
    }

    fn error(&mut self, diagnostic: &Diagnostic) {
        error!(location = %diagnostic.location, "{}", diagnostic.message);
    }

    /// Hand over the accumulated output, leaving the strategy empty.
    fn result(&mut self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Chapter;

    #[derive(Default)]
    struct Minimal {
        out: Vec<String>,
    }

    impl Strategy for Minimal {
        fn headline(&mut self, level: usize, _label: Option<&str>, caption: &str) {
            self.out.push(format!("h{level}:{caption}"));
        }

        fn paragraph(&mut self, lines: &[String]) {
            self.out.push(format!("p:{}", lines.join("|")));
        }

        fn nofunc_text(&mut self, text: &str) -> String {
            text.to_string()
        }

        fn result(&mut self) -> String {
            std::mem::take(&mut self.out).join("\n")
        }
    }

    #[test]
    fn test_list_defaults_fall_back_to_paragraph() {
        let mut s = Minimal::default();
        s.ul_item(&["a".to_string(), "b".to_string()]);
        s.ol_item(&["c".to_string()], "1");
        s.dt("term");
        assert_eq!(s.result(), "p:a|b\np:c\np:term");
        assert_eq!(s.result(), "");
    }

    #[test]
    fn test_optional_capabilities_absent() {
        let mut s = Minimal::default();
        let chapter = Chapter::new("ch.re", Some(1), "");
        assert!(!s.supports_command("quote"));
        assert!(!s.supports_inline("b"));
        assert!(!s.supports_tagged_section("column"));
        assert_eq!(
            s.inline(&chapter, "b", "x"),
            Err(StrategyError::Unsupported)
        );
        assert_eq!(
            s.tagged_section_end("column", 2),
            Err(StrategyError::Unsupported)
        );
    }
}
