//! Option hooks run on each job just before it is submitted to the compiler.

use std::path::PathBuf;

use crate::compiler::Compiler;
use crate::options::CompileOptions;

/// Result of an option hook. A failing hook fails only its own job.
pub type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Everything known about a job at the moment its options are finalized.
#[derive(Debug, Clone)]
pub struct JobDetails {
    /// Absolute path of the entry-point source file
    pub source: PathBuf,
    /// Output path relative to the destination root
    pub output_path: PathBuf,
    /// Destination root of the current build pass
    pub dest_dir: PathBuf,
    /// `dest_dir` joined with `output_path`
    pub full_output_path: PathBuf,
    /// The job's own options; hooks may replace or edit them
    pub options: CompileOptions,
}

/// Transform applied to a job's options before compilation.
///
/// Hooks run synchronously in registration order.
pub trait OptionsHook: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str {
        "hook"
    }

    /// Adjust `details.options` for this job.
    fn prepare(&self, details: &mut JobDetails, compiler: &dyn Compiler) -> HookResult;
}
