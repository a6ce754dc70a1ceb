//! Python bindings for the review chapter compiler.

use std::collections::HashMap;
use std::path::PathBuf;

use pyo3::prelude::*;
use review_core::builders::{HtmlStrategy, LatexStrategy};
use review_core::{
    Chapter, CompileResult as CoreCompileResult, Compiler, Config, Diagnostic as CoreDiagnostic,
    Severity as CoreSeverity, SyntaxRegistry,
};

// ============================================================================
// Enums
// ============================================================================

/// Diagnostic severity.
#[pyclass(frozen, eq, eq_int, name = "Severity")]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PySeverity {
    Warning,
    Error,
}

impl From<CoreSeverity> for PySeverity {
    fn from(s: CoreSeverity) -> Self {
        match s {
            CoreSeverity::Warning => PySeverity::Warning,
            CoreSeverity::Error => PySeverity::Error,
        }
    }
}

/// Output format.
#[pyclass(frozen, eq, eq_int, name = "Format")]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PyFormat {
    Latex,
    Html,
}

// ============================================================================
// Diagnostics
// ============================================================================

/// A warning or error reported while compiling.
#[pyclass(frozen, get_all, name = "Diagnostic")]
#[derive(Clone)]
pub struct PyDiagnostic {
    pub severity: PySeverity,
    pub message: String,
    pub file: String,
    pub line: usize,
}

#[pymethods]
impl PyDiagnostic {
    fn __repr__(&self) -> String {
        format!(
            "Diagnostic({:?}, {:?}, line={})",
            self.severity, self.message, self.line
        )
    }

    fn __str__(&self) -> String {
        let severity = match self.severity {
            PySeverity::Warning => "warning",
            PySeverity::Error => "error",
        };
        format!("{}:{}: {}: {}", self.file, self.line, severity, self.message)
    }
}

impl From<CoreDiagnostic> for PyDiagnostic {
    fn from(d: CoreDiagnostic) -> Self {
        PyDiagnostic {
            severity: d.severity.into(),
            message: d.message,
            file: d.location.file,
            line: d.location.line,
        }
    }
}

// ============================================================================
// CompileResult
// ============================================================================

/// Output of one compile run. Always produced, even for broken input.
#[pyclass(frozen, name = "CompileResult")]
pub struct PyCompileResult {
    #[pyo3(get)]
    pub output: String,
    #[pyo3(get)]
    pub diagnostics: Vec<PyDiagnostic>,
}

#[pymethods]
impl PyCompileResult {
    /// True when no errors were reported (warnings allowed).
    #[getter]
    fn ok(&self) -> bool {
        self.error_count() == 0
    }

    #[getter]
    fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == PySeverity::Error)
            .count()
    }

    fn __repr__(&self) -> String {
        format!(
            "CompileResult(ok={}, output={} bytes, diagnostics={})",
            self.ok(),
            self.output.len(),
            self.diagnostics.len()
        )
    }
}

impl From<CoreCompileResult> for PyCompileResult {
    fn from(r: CoreCompileResult) -> Self {
        PyCompileResult {
            output: r.output,
            diagnostics: r.diagnostics.into_iter().map(PyDiagnostic::from).collect(),
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Chapter compiler.
///
/// Args:
///     format: Format.Latex (default) or Format.Html
///     numbering: Prefix headlines with their number
///     secnolevel: Deepest headline level numbered by the output format
#[pyclass(name = "Compiler")]
pub struct PyCompiler {
    format: PyFormat,
    config: Config,
}

#[pymethods]
impl PyCompiler {
    #[new]
    #[pyo3(
        signature = (format=None, numbering=false, secnolevel=2),
        text_signature = "(format=None, numbering=False, secnolevel=2)"
    )]
    fn new(format: Option<PyFormat>, numbering: bool, secnolevel: usize) -> Self {
        PyCompiler {
            format: format.unwrap_or(PyFormat::Latex),
            config: Config::default()
                .with_heading_numbering(numbering)
                .with_secnolevel(secnolevel),
        }
    }

    /// Load compiler settings from a TOML file. Raises ValueError on error.
    #[staticmethod]
    #[pyo3(signature = (path, format=None), text_signature = "(path, format=None)")]
    fn from_config(path: PathBuf, format: Option<PyFormat>) -> PyResult<Self> {
        let config = Config::load(&path)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        Ok(PyCompiler {
            format: format.unwrap_or(PyFormat::Latex),
            config,
        })
    }

    /// Compile a chapter. Always returns a result.
    ///
    /// Args:
    ///     source: Chapter source text
    ///     basename: File name used in diagnostics and labels
    ///     chapter_number: Number used in headline numbers and references
    ///     images: Mapping of image id to file path
    ///     image_dir: Directory searched for image files
    #[pyo3(
        signature = (source, basename="chapter.re", chapter_number=Some(1), images=None, image_dir=None),
        text_signature = "(self, source, basename='chapter.re', chapter_number=1, images=None, image_dir=None)"
    )]
    fn compile(
        &self,
        source: &str,
        basename: &str,
        chapter_number: Option<u32>,
        images: Option<HashMap<String, PathBuf>>,
        image_dir: Option<PathBuf>,
    ) -> PyCompileResult {
        let mut chapter = Chapter::new(basename, chapter_number, source);
        for (id, path) in images.unwrap_or_default() {
            chapter = chapter.with_image_path(&id, path);
        }
        if let Some(dir) = image_dir {
            chapter.bind_images(&dir);
        }
        self.run(&chapter).into()
    }

    /// Compile a chapter. Raises ValueError on the first error.
    #[pyo3(
        signature = (source, basename="chapter.re", chapter_number=Some(1)),
        text_signature = "(self, source, basename='chapter.re', chapter_number=1)"
    )]
    fn compile_strict(
        &self,
        source: &str,
        basename: &str,
        chapter_number: Option<u32>,
    ) -> PyResult<String> {
        let chapter = Chapter::new(basename, chapter_number, source);
        self.run(&chapter)
            .into_result()
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "Compiler(format={:?}, numbering={})",
            self.format, self.config.heading_numbering
        )
    }
}

impl PyCompiler {
    fn run(&self, chapter: &Chapter) -> CoreCompileResult {
        let config = self.config.clone();
        match self.format {
            PyFormat::Latex => Compiler::new(LatexStrategy::new())
                .with_config(config)
                .compile(chapter),
            PyFormat::Html => Compiler::new(HtmlStrategy::new())
                .with_config(config)
                .compile(chapter),
        }
    }
}

// ============================================================================
// Module functions
// ============================================================================

/// Compile a chapter with default settings.
///
/// Args:
///     source: Chapter source text
///     format: Output format (default: Format.Latex)
///     chapter_number: Number used in headline numbers and references
///     numbering: Prefix headlines with their number
///
/// Returns:
///     CompileResult: Output and diagnostics
#[pyfunction]
#[pyo3(
    signature = (source, format=None, chapter_number=Some(1), numbering=false),
    text_signature = "(source, format=None, chapter_number=1, numbering=False)"
)]
fn compile(
    source: &str,
    format: Option<PyFormat>,
    chapter_number: Option<u32>,
    numbering: bool,
) -> PyCompileResult {
    let compiler = PyCompiler::new(format, numbering, Config::default().secnolevel);
    let chapter = Chapter::new("chapter.re", chapter_number, source);
    compiler.run(&chapter).into()
}

/// Names of the registered block and single-line commands.
#[pyfunction]
fn block_commands() -> Vec<String> {
    SyntaxRegistry::standard()
        .commands()
        .map(|d| d.name.clone())
        .collect()
}

/// Names of the registered inline ops.
#[pyfunction]
fn inline_commands() -> Vec<String> {
    SyntaxRegistry::standard()
        .inlines()
        .map(|d| d.name.clone())
        .collect()
}

// ============================================================================
// Module
// ============================================================================

/// review - chapter compiler with LaTeX and HTML output.
#[pymodule]
fn pyreview(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySeverity>()?;
    m.add_class::<PyFormat>()?;
    m.add_class::<PyDiagnostic>()?;
    m.add_class::<PyCompileResult>()?;
    m.add_class::<PyCompiler>()?;
    m.add_function(wrap_pyfunction!(compile, m)?)?;
    m.add_function(wrap_pyfunction!(block_commands, m)?)?;
    m.add_function(wrap_pyfunction!(inline_commands, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
