//! Stylesheet compiler seam.
//!
//! The build engine never looks inside stylesheets. Each job is handed to a
//! [`Compiler`], which turns a [`CompileOptions`] record into CSS text or a
//! [`CompileFailure`] carrying the location of the problem.
//!
//! [`LightningCompiler`] is the bundled implementation. It runs plain CSS
//! sources through lightningcss, so it pairs with `extension = "css"`.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::options::{CompileOptions, OutputStyle};

/// Successful compiler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Compiled stylesheet text
    pub css: String,
    /// Time the compiler reports having spent
    pub duration: Duration,
}

/// A compile error with its reported location.
///
/// `file` is the file the compiler blames, which may be a partial included
/// by the entry point rather than the entry point itself. Line and column
/// are 1-indexed; 0 means the compiler did not report a position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CompileFailure {
    /// Error message
    pub message: String,
    /// File the error was reported in
    pub file: PathBuf,
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

impl CompileFailure {
    /// Create a failure without position information.
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { message: message.into(), file: file.into(), line: 0, column: 0 }
    }

    /// Create a failure with full location information.
    pub fn with_location(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self { message: message.into(), file: file.into(), line, column }
    }

    /// Wrap an I/O error raised while handling `file`.
    pub fn io(file: impl Into<PathBuf>, action: &str, err: &std::io::Error) -> Self {
        Self::new(file, format!("{}: {}", action, err))
    }
}

/// An external stylesheet compiler.
///
/// `render` is synchronous and may block; the orchestrator runs it on the
/// blocking thread pool.
pub trait Compiler: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str {
        "compiler"
    }

    /// Compile the stylesheet described by `options`.
    fn render(&self, options: &CompileOptions) -> Result<Rendered, CompileFailure>;
}

/// Compiler backed by lightningcss.
///
/// Reads `options.data` when present, otherwise the file at `options.file`.
/// `OutputStyle::Compressed` minifies the output.
#[derive(Debug, Clone, Default)]
pub struct LightningCompiler;

impl LightningCompiler {
    /// Create a new lightningcss compiler.
    pub fn new() -> Self {
        Self
    }

    fn compile_source(
        &self,
        source: &str,
        filename: &Path,
        style: OutputStyle,
    ) -> Result<String, CompileFailure> {
        let parser_options =
            ParserOptions { filename: filename.display().to_string(), ..ParserOptions::default() };
        let mut sheet = StyleSheet::parse(source, parser_options)
            .map_err(|e| failure_from(filename, e))?;

        let minify = style == OutputStyle::Compressed;
        if minify {
            sheet.minify(MinifyOptions::default()).map_err(|e| failure_from(filename, e))?;
        }

        let printed = sheet
            .to_css(PrinterOptions { minify, ..PrinterOptions::default() })
            .map_err(|e| failure_from(filename, e))?;
        Ok(printed.code)
    }
}

impl Compiler for LightningCompiler {
    fn name(&self) -> &str {
        "lightningcss"
    }

    fn render(&self, options: &CompileOptions) -> Result<Rendered, CompileFailure> {
        let start = Instant::now();
        let filename = options.file.clone().unwrap_or_else(|| PathBuf::from("stdin"));

        let css = match &options.data {
            Some(data) => self.compile_source(data, &filename, options.output_style)?,
            None => {
                let file = options
                    .file
                    .as_ref()
                    .ok_or_else(|| CompileFailure::new(&filename, "no input file or data given"))?;
                let source = fs::read_to_string(file)
                    .map_err(|e| CompileFailure::io(file, "failed to read stylesheet", &e))?;
                self.compile_source(&source, file, options.output_style)?
            }
        };

        Ok(Rendered { css, duration: start.elapsed() })
    }
}

/// Convert a lightningcss error into a located failure.
fn failure_from<T: Display>(file: &Path, err: lightningcss::error::Error<T>) -> CompileFailure {
    match err.loc {
        // lightningcss lines are 0-indexed, columns 1-indexed
        Some(loc) => CompileFailure::with_location(
            PathBuf::from(loc.filename),
            loc.line as usize + 1,
            loc.column as usize,
            err.kind.to_string(),
        ),
        None => CompileFailure::new(file, err.kind.to_string()),
    }
}
