//! Per-run mutable state: open tagged sections and headline counters.

use crate::error::Diagnostics;

/// An open tagged section such as `==[column] Title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSectionFrame {
    pub tag: String,
    pub level: usize,
}

/// Stack of open tagged sections, strictly increasing in level.
#[derive(Debug, Default)]
pub struct SectionStack {
    frames: Vec<TaggedSectionFrame>,
}

impl SectionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: impl Into<String>, level: usize) {
        self.frames.push(TaggedSectionFrame {
            tag: tag.into(),
            level,
        });
    }

    /// Pop every frame at `level` or deeper, innermost first.
    pub fn close_from(&mut self, level: usize) -> Vec<TaggedSectionFrame> {
        let mut closed = Vec::new();
        while self.frames.last().is_some_and(|f| f.level >= level) {
            if let Some(frame) = self.frames.pop() {
                closed.push(frame);
            }
        }
        closed
    }

    /// Pop everything, innermost first.
    pub fn drain_all(&mut self) -> Vec<TaggedSectionFrame> {
        self.close_from(0)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Numbering path for untagged headlines, e.g. `[3, 2, 1]` for 3.2.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineCounters {
    path: Vec<u32>,
}

impl HeadlineCounters {
    /// Seed with the chapter number so the first `=` headline gets it.
    pub fn new(chapter_number: Option<u32>) -> Self {
        Self {
            path: vec![chapter_number.unwrap_or(0).saturating_sub(1)],
        }
    }

    /// Count a headline at `level` (1-based) and return the new path.
    ///
    /// Deeper counters are discarded; skipped depths start at 0.
    pub fn advance(&mut self, level: usize) -> &[u32] {
        let depth = level.max(1);
        self.path.truncate(depth);
        if self.path.len() < depth {
            self.path.resize(depth, 0);
        }
        if let Some(last) = self.path.last_mut() {
            *last = last.saturating_add(1);
        }
        &self.path
    }

    pub fn path(&self) -> &[u32] {
        &self.path
    }

    /// `3.2.1` style rendering of the current path.
    pub fn dotted(&self) -> String {
        self.path
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Everything a single compile run mutates besides the strategy.
#[derive(Debug)]
pub struct RunState {
    pub sections: SectionStack,
    pub counters: HeadlineCounters,
    pub diagnostics: Diagnostics,
}

impl RunState {
    pub fn new(chapter_number: Option<u32>) -> Self {
        Self {
            sections: SectionStack::new(),
            counters: HeadlineCounters::new(chapter_number),
            diagnostics: Diagnostics::new(),
        }
    }
}
