//! The chapter model the compiler and strategies query.
//!
//! [`DocumentContext`] is the narrow interface: numbering, id lookups and the
//! raw source. [`Chapter`] is an in-memory implementation that builds its
//! list/table/image/footnote indexes by scanning its own source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::scanner::LineScanner;
use crate::syntax::{parse_args, split_command};

/// A numbered list or table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexItem {
    pub id: String,
    /// 1-based position among items of the same kind in this chapter.
    pub number: usize,
}

/// A numbered image; bound when a file path is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    pub id: String,
    pub number: usize,
    pub path: Option<PathBuf>,
}

impl ImageItem {
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteItem {
    pub id: String,
    pub number: usize,
    pub content: String,
}

/// What the compiler and strategies may ask about the chapter being compiled.
pub trait DocumentContext {
    /// Identifier used in labels, usually the basename without extension.
    fn id(&self) -> &str;

    /// File name used in diagnostics.
    fn basename(&self) -> &str;

    fn number(&self) -> Option<u32>;

    /// Whether headlines in this chapter get numbers.
    fn is_numbered(&self) -> bool;

    /// Raw source text.
    fn content(&self) -> &str;

    fn list(&self, id: &str) -> Option<&IndexItem>;
    fn table(&self, id: &str) -> Option<&IndexItem>;
    fn image(&self, id: &str) -> Option<&ImageItem>;
    fn footnote(&self, id: &str) -> Option<&FootnoteItem>;

    /// Chapter number as printed in cross references; empty when unnumbered.
    fn number_label(&self) -> String {
        self.number().map(|n| n.to_string()).unwrap_or_default()
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "pdf", "eps"];

/// Where a chapter sits in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChapterKind {
    /// Body chapter; headlines are numbered.
    #[default]
    Chapter,
    Preface,
    Appendix,
    Postscript,
}

/// Items of one kind, numbered in order of first appearance.
#[derive(Debug)]
struct Index<T> {
    items: Vec<T>,
    by_id: HashMap<String, usize>,
}

impl<T> Default for Index<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T> Index<T> {
    fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let idx = *self.by_id.get(id)?;
        self.items.get_mut(idx)
    }

    fn next_number(&self) -> usize {
        self.items.len() + 1
    }

    fn insert(&mut self, id: &str, item: T) {
        if self.by_id.contains_key(id) {
            return;
        }
        self.by_id.insert(id.to_string(), self.items.len());
        self.items.push(item);
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// An in-memory chapter.
///
/// # Example
///
/// ```rust
/// use review_core::context::{Chapter, DocumentContext};
///
/// let chapter = Chapter::new("intro.re", Some(1), "//list[hello][Hello]{\nputs 1\n//}\n");
/// assert_eq!(chapter.id(), "intro");
/// assert_eq!(chapter.list("hello").map(|l| l.number), Some(1));
/// ```
#[derive(Debug)]
pub struct Chapter {
    id: String,
    basename: String,
    number: Option<u32>,
    kind: ChapterKind,
    content: String,
    lists: Index<IndexItem>,
    tables: Index<IndexItem>,
    images: Index<ImageItem>,
    footnotes: Index<FootnoteItem>,
}

impl Chapter {
    /// Create a body chapter and index its source.
    pub fn new(basename: impl Into<String>, number: Option<u32>, content: impl Into<String>) -> Self {
        let basename = basename.into();
        let id = Path::new(&basename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| basename.clone());

        let mut chapter = Self {
            id,
            basename,
            number,
            kind: ChapterKind::Chapter,
            content: content.into(),
            lists: Index::default(),
            tables: Index::default(),
            images: Index::default(),
            footnotes: Index::default(),
        };
        chapter.index_source();
        chapter
    }

    pub fn with_kind(mut self, kind: ChapterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Bind an image id to a file. Unknown ids are ignored.
    pub fn with_image_path(mut self, id: &str, path: impl Into<PathBuf>) -> Self {
        if let Some(image) = self.images.get_mut(id) {
            image.path = Some(path.into());
        }
        self
    }

    /// Bind every unbound image whose file exists under `dir`.
    ///
    /// Tries `dir/<chapter id>/<image id>.<ext>`, then
    /// `dir/<chapter id>-<image id>.<ext>`, for each known extension in turn.
    /// Returns the number of images bound.
    pub fn bind_images(&mut self, dir: &Path) -> usize {
        let mut bound = 0;
        for image in self.images.items.iter_mut().filter(|img| img.path.is_none()) {
            let candidates = [
                (dir.join(&self.id), image.id.clone()),
                (dir.to_path_buf(), format!("{}-{}", self.id, image.id)),
            ];
            let found = candidates.iter().find_map(|(base, stem)| {
                IMAGE_EXTENSIONS
                    .iter()
                    .map(|ext| base.join(format!("{stem}.{ext}")))
                    .find(|path| path.is_file())
            });
            if let Some(path) = found {
                debug!(image = %image.id, path = %path.display(), "bound image");
                image.path = Some(path);
                bound += 1;
            }
        }
        bound
    }

    /// Images in order of appearance.
    pub fn images(&self) -> impl Iterator<Item = &ImageItem> {
        self.images.items.iter()
    }

    pub fn kind(&self) -> ChapterKind {
        self.kind
    }

    /// Rebuild the list/table/image/footnote indexes from the source.
    ///
    /// Image paths bound earlier are kept for ids that still exist.
    pub fn index_source(&mut self) {
        let bound: HashMap<String, PathBuf> = self
            .images
            .items
            .iter()
            .filter_map(|img| img.path.clone().map(|p| (img.id.clone(), p)))
            .collect();

        let mut lists = Index::default();
        let mut tables = Index::default();
        let mut images = Index::default();
        let mut footnotes = Index::default();

        let mut scanner = LineScanner::new(&self.content);
        while let Some(line) = scanner.next_line() {
            let Some((name, args)) = command_head(line.text) else {
                continue;
            };
            let Some(id) = args.first().filter(|id| !id.is_empty()) else {
                continue;
            };
            match name {
                "list" | "listnum" => {
                    let number = lists.next_number();
                    lists.insert(id, IndexItem { id: id.clone(), number });
                }
                "table" => {
                    let number = tables.next_number();
                    tables.insert(id, IndexItem { id: id.clone(), number });
                }
                "image" | "numberlessimage" => {
                    let number = images.next_number();
                    let path = bound.get(id).cloned();
                    images.insert(id, ImageItem { id: id.clone(), number, path });
                }
                "footnote" => {
                    let number = footnotes.next_number();
                    let content = args.get(1).cloned().unwrap_or_default();
                    footnotes.insert(id, FootnoteItem { id: id.clone(), number, content });
                }
                _ => {}
            }
        }

        debug!(
            chapter = %self.id,
            lists = lists.len(),
            tables = tables.len(),
            images = images.len(),
            footnotes = footnotes.len(),
            "indexed chapter"
        );

        self.lists = lists;
        self.tables = tables;
        self.images = images;
        self.footnotes = footnotes;
    }
}

/// Name and parsed arguments of a `//name[...]` line.
fn command_head(line: &str) -> Option<(&str, Vec<String>)> {
    let (name, arg_text) = split_command(line)?;
    let args = parse_args(arg_text).ok()?;
    Some((name, args))
}

impl DocumentContext for Chapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn basename(&self) -> &str {
        &self.basename
    }

    fn number(&self) -> Option<u32> {
        self.number
    }

    fn is_numbered(&self) -> bool {
        self.kind == ChapterKind::Chapter
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn list(&self, id: &str) -> Option<&IndexItem> {
        self.lists.get(id)
    }

    fn table(&self, id: &str) -> Option<&IndexItem> {
        self.tables.get(id)
    }

    fn image(&self, id: &str) -> Option<&ImageItem> {
        self.images.get(id)
    }

    fn footnote(&self, id: &str) -> Option<&FootnoteItem> {
        self.footnotes.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
= Title

//list[first][First]{
a
//}

//table[t1][Numbers]{
x\ty
//}

//listnum[second][Second]{
b
//}

//image[fig][Figure]{
//}

//footnote[note1][See the appendix.]
#@//list[hidden][Hidden]{
";

    #[test]
    fn test_index_numbers_in_order() {
        let chapter = Chapter::new("ch02.re", Some(2), SOURCE);
        assert_eq!(chapter.id(), "ch02");
        assert_eq!(chapter.basename(), "ch02.re");
        assert_eq!(chapter.list("first").map(|i| i.number), Some(1));
        assert_eq!(chapter.list("second").map(|i| i.number), Some(2));
        assert_eq!(chapter.table("t1").map(|i| i.number), Some(1));
        assert!(chapter.list("hidden").is_none());
        assert_eq!(
            chapter.footnote("note1").map(|f| f.content.as_str()),
            Some("See the appendix.")
        );
    }

    #[test]
    fn test_image_binding() {
        let chapter = Chapter::new("ch02.re", Some(2), SOURCE)
            .with_image_path("fig", "images/ch02/fig.png")
            .with_image_path("missing", "nowhere.png");
        let fig = chapter.image("fig").unwrap();
        assert!(fig.is_bound());
        assert!(chapter.image("missing").is_none());

        let mut chapter = chapter;
        chapter.index_source();
        assert!(chapter.image("fig").unwrap().is_bound());
    }

    #[test]
    fn test_bind_images_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ch02")).unwrap();
        std::fs::write(dir.path().join("ch02").join("fig.png"), b"").unwrap();

        let mut chapter = Chapter::new("ch02.re", Some(2), "//image[fig][A]{\n//}\n//image[other][B]{\n//}\n");
        assert_eq!(chapter.bind_images(dir.path()), 1);
        assert_eq!(
            chapter.image("fig").and_then(|i| i.path.clone()),
            Some(dir.path().join("ch02").join("fig.png"))
        );
        assert!(!chapter.image("other").unwrap().is_bound());

        std::fs::write(dir.path().join("ch02-other.jpg"), b"").unwrap();
        assert_eq!(chapter.bind_images(dir.path()), 1);
        assert_eq!(chapter.images().filter(|i| i.is_bound()).count(), 2);
    }

    #[test]
    fn test_kind_controls_numbering() {
        let pre = Chapter::new("preface.re", None, "").with_kind(ChapterKind::Preface);
        assert!(!pre.is_numbered());
        assert_eq!(pre.number_label(), "");
        assert!(Chapter::new("ch01.re", Some(1), "").is_numbered());
    }

    #[test]
    fn test_command_head() {
        let (name, args) = command_head("//list[a][cap]{").unwrap();
        assert_eq!(name, "list");
        assert_eq!(args, ["a", "cap"]);
        assert!(command_head("// nothing").is_none());
        assert!(command_head("//list[a][b").is_none());
    }
}
