//! Job expansion.
//!
//! Every discovered entry point is handed to a [`Generator`], which emits
//! zero or more compile jobs into a [`JobCollector`] before returning.

use std::path::{Path, PathBuf};

use crate::build::discovery::SourceSet;
use crate::options::CompileOptions;

/// A discovered entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Source root the file was found under
    pub root: PathBuf,
    /// Path relative to `root`
    pub relative: PathBuf,
}

impl SourceFile {
    /// Create a source file entry.
    pub fn new(root: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), relative: relative.into() }
    }

    /// Full path of the file.
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.relative)
    }
}

/// A unit of compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileJob {
    /// Entry point the job was expanded from
    pub source: SourceFile,
    /// Output path relative to the output root
    pub output_path: PathBuf,
    /// Options owned by this job alone
    pub options: CompileOptions,
}

/// Receives the jobs a generator emits for one source.
#[derive(Debug, Default)]
pub struct JobCollector {
    emitted: Vec<(PathBuf, CompileOptions)>,
}

impl JobCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one job. The options are cloned, so the caller may keep
    /// editing its copy for the next emission.
    pub fn emit(&mut self, output_path: impl Into<PathBuf>, options: &CompileOptions) {
        self.emitted.push((output_path.into(), options.clone()));
    }

    /// Number of jobs emitted so far.
    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    /// Check if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    fn into_jobs(self, source: &SourceFile) -> impl Iterator<Item = CompileJob> + '_ {
        self.emitted.into_iter().map(move |(output_path, options)| CompileJob {
            source: source.clone(),
            output_path,
            options,
        })
    }
}

/// Expands one entry point into compile jobs.
///
/// `generate` must emit synchronously; anything emitted after it returns
/// cannot reach the collector.
pub trait Generator: Send + Sync {
    /// Emit the jobs for `source`.
    ///
    /// # Arguments
    /// - `source` - The entry point
    /// - `default_output` - The source's relative path with a `.css` extension
    /// - `options` - Base options with `file` already set to the source
    /// - `jobs` - Collector receiving the emitted jobs
    fn generate(
        &self,
        source: &SourceFile,
        default_output: &Path,
        options: &CompileOptions,
        jobs: &mut JobCollector,
    );
}

/// Emits exactly one job per source with the default output path.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityGenerator;

impl Generator for IdentityGenerator {
    fn generate(
        &self,
        _source: &SourceFile,
        default_output: &Path,
        options: &CompileOptions,
        jobs: &mut JobCollector,
    ) {
        jobs.emit(default_output, options);
    }
}

/// Generator backed by a closure. Build with [`from_fn`].
pub struct FnGenerator<F> {
    f: F,
}

/// Wrap a closure as a [`Generator`].
pub fn from_fn<F>(f: F) -> FnGenerator<F>
where
    F: Fn(&SourceFile, &Path, &CompileOptions, &mut JobCollector) + Send + Sync,
{
    FnGenerator { f }
}

impl<F> Generator for FnGenerator<F>
where
    F: Fn(&SourceFile, &Path, &CompileOptions, &mut JobCollector) + Send + Sync,
{
    fn generate(
        &self,
        source: &SourceFile,
        default_output: &Path,
        options: &CompileOptions,
        jobs: &mut JobCollector,
    ) {
        (self.f)(source, default_output, options, jobs)
    }
}

/// Default output path: the relative source path with a `css` extension.
pub fn default_output_path(relative: &Path) -> PathBuf {
    relative.with_extension("css")
}

/// Expand every discovered source into jobs, in discovery then emission order.
pub fn expand_jobs(
    sets: &[SourceSet],
    base: &CompileOptions,
    generator: &dyn Generator,
) -> Vec<CompileJob> {
    let mut jobs = Vec::new();

    for source in sets.iter().flat_map(|set| set.files.iter()) {
        let mut options = base.clone();
        options.file = Some(source.path());

        let mut collector = JobCollector::new();
        generator.generate(source, &default_output_path(&source.relative), &options, &mut collector);

        if collector.is_empty() {
            tracing::debug!(source = %source.path().display(), "generator emitted no jobs");
        }
        jobs.extend(collector.into_jobs(source));
    }

    jobs
}
