//! Build result types.
//!
//! Contains types for representing the outcome of compile jobs and of a
//! whole build pass.

use std::path::PathBuf;
use std::time::Duration;

use crate::compiler::CompileFailure;

/// Status of a single compile job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Output was written
    Compiled {
        /// Duration reported by the compiler
        duration: Duration,
        /// Size of the written output in bytes
        bytes: usize,
    },
    /// The job failed; siblings are unaffected
    Failed(CompileFailure),
}

impl JobStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Compiled { .. })
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed(_))
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Compiled { .. } => write!(f, "compiled"),
            JobStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Settled result of one compile job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Entry point, as its source root joined with its relative path
    pub source: PathBuf,
    /// Output path relative to the output root
    pub output_path: PathBuf,
    /// How the job settled
    pub status: JobStatus,
    /// Wall time from submission to settlement
    pub elapsed: Duration,
}

impl JobOutcome {
    /// Create a successful outcome.
    pub fn compiled(
        source: PathBuf,
        output_path: PathBuf,
        duration: Duration,
        bytes: usize,
        elapsed: Duration,
    ) -> Self {
        Self { source, output_path, status: JobStatus::Compiled { duration, bytes }, elapsed }
    }

    /// Create a failed outcome.
    pub fn failed(
        source: PathBuf,
        output_path: PathBuf,
        failure: CompileFailure,
        elapsed: Duration,
    ) -> Self {
        Self { source, output_path, status: JobStatus::Failed(failure), elapsed }
    }

    /// Check if this job succeeded.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The failure, if the job failed.
    pub fn failure(&self) -> Option<&CompileFailure> {
        match &self.status {
            JobStatus::Failed(failure) => Some(failure),
            JobStatus::Compiled { .. } => None,
        }
    }
}

/// Result of a complete build pass.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Outcome of every job, in job order
    pub outcomes: Vec<JobOutcome>,
    /// Total pass duration
    pub total_duration: Duration,
    /// Set when the rebuild trigger skipped the pass
    pub up_to_date: bool,
}

impl BuildReport {
    /// Create a report from settled outcomes.
    pub fn new(outcomes: Vec<JobOutcome>) -> Self {
        Self { outcomes, ..Default::default() }
    }

    /// Report for a pass the rebuild trigger skipped.
    pub fn up_to_date() -> Self {
        Self { up_to_date: true, ..Default::default() }
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get the number of compiled jobs.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Get the number of failed jobs.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failure()).count()
    }

    /// Check if the pass succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get all written output paths, relative to the output root.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.outcomes.iter().filter(|o| o.is_success()).map(|o| &o.output_path).collect()
    }

    /// Get failed outcomes.
    pub fn failures(&self) -> Vec<&JobOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure()).collect()
    }

    /// Format a summary of the build pass.
    pub fn summary(&self) -> String {
        if self.up_to_date {
            return "Build skipped: sources unchanged".to_string();
        }

        let mut lines = Vec::new();

        let success = self.success_count();
        let failed = self.failed_count();
        let total = self.outcomes.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} compiled, {} failed ({} total)",
                success, failed, total
            ));
            for outcome in self.failures() {
                lines.push(format!("  - {}: {}", outcome.source.display(), outcome.status));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} compiled ({} total) in {:?}",
                success, total, self.total_duration
            ));
        }

        lines.join("\n")
    }
}
