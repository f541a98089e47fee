//! Concurrent compilation of expanded jobs.
//!
//! Job preparation (option cloning and hooks) is synchronous and happens in
//! job order. Every prepared job is then spawned at once: the compiler runs
//! on the blocking pool and directory creation and writes go through
//! `tokio::fs`. There is no bound on the number of jobs in flight.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::build::hook::{JobDetails, OptionsHook};
use crate::build::job::CompileJob;
use crate::build::progress::{NullReporter, Reporter};
use crate::build::result::JobOutcome;
use crate::build::signal::FailureSignal;
use crate::compiler::{CompileFailure, Compiler};

/// Runs compile jobs concurrently and collects every outcome.
#[derive(Clone)]
pub struct Orchestrator {
    compiler: Arc<dyn Compiler>,
    hooks: Vec<Arc<dyn OptionsHook>>,
    reporter: Arc<dyn Reporter>,
    signal: FailureSignal,
    dest_dir: PathBuf,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("compiler", &self.compiler.name())
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("dest_dir", &self.dest_dir)
            .finish_non_exhaustive()
    }
}

/// A job that has been prepared, or rejected by a hook.
enum Pending {
    Spawned {
        handle: JoinHandle<JobOutcome>,
        source: PathBuf,
        output_path: PathBuf,
        started: Instant,
    },
    Rejected(JobOutcome),
}

impl Orchestrator {
    /// Create an orchestrator writing below `dest_dir`.
    pub fn new(compiler: Arc<dyn Compiler>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            compiler,
            hooks: Vec::new(),
            reporter: Arc::new(NullReporter),
            signal: FailureSignal::new(),
            dest_dir: dest_dir.into(),
        }
    }

    /// Append an options hook. Hooks run in the order they were added.
    pub fn with_hook(mut self, hook: Arc<dyn OptionsHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set the reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the fatal-failure channel.
    pub fn with_signal(mut self, signal: FailureSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Destination root.
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Finalize a job's options: run every hook, then point `out_file` at
    /// the absolute output path.
    pub fn prepare(&self, job: &CompileJob) -> Result<JobDetails, CompileFailure> {
        let source = job.source.path();
        let mut details = JobDetails {
            full_output_path: self.dest_dir.join(&job.output_path),
            output_path: job.output_path.clone(),
            dest_dir: self.dest_dir.clone(),
            options: job.options.clone(),
            source,
        };

        for hook in &self.hooks {
            hook.prepare(&mut details, self.compiler.as_ref()).map_err(|e| {
                CompileFailure::new(&details.source, format!("{} hook failed: {}", hook.name(), e))
            })?;
        }

        details.options.out_file = Some(details.full_output_path.clone());
        Ok(details)
    }

    /// Compile every job and wait until all of them have settled.
    ///
    /// A failing job never stops its siblings. Outcomes come back in job
    /// order; each one is reported, and each failure raised on the signal,
    /// as soon as the job settles.
    pub async fn run(&self, jobs: Vec<CompileJob>) -> Vec<JobOutcome> {
        let mut pending = Vec::with_capacity(jobs.len());

        for job in &jobs {
            let started = Instant::now();
            match self.prepare(job) {
                Ok(details) => {
                    tracing::debug!(
                        source = %details.source.display(),
                        output = %details.full_output_path.display(),
                        "submitting compile job"
                    );
                    let source = details.source.clone();
                    let output_path = details.output_path.clone();
                    let handle = tokio::spawn(settle(
                        Arc::clone(&self.compiler),
                        Arc::clone(&self.reporter),
                        self.signal.clone(),
                        details,
                        started,
                    ));
                    pending.push(Pending::Spawned { handle, source, output_path, started });
                }
                Err(failure) => {
                    let outcome = JobOutcome::failed(
                        job.source.path(),
                        job.output_path.clone(),
                        failure,
                        started.elapsed(),
                    );
                    finish(self.reporter.as_ref(), &self.signal, &outcome);
                    pending.push(Pending::Rejected(outcome));
                }
            }
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for entry in pending {
            let outcome = match entry {
                Pending::Rejected(outcome) => outcome,
                Pending::Spawned { handle, source, output_path, started } => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let failure =
                            CompileFailure::new(&source, format!("compile task failed: {}", e));
                        let outcome =
                            JobOutcome::failed(source, output_path, failure, started.elapsed());
                        finish(self.reporter.as_ref(), &self.signal, &outcome);
                        outcome
                    }
                },
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

/// Run one prepared job to completion and announce its outcome.
async fn settle(
    compiler: Arc<dyn Compiler>,
    reporter: Arc<dyn Reporter>,
    signal: FailureSignal,
    details: JobDetails,
    started: Instant,
) -> JobOutcome {
    let source = details.source.clone();
    let output_path = details.output_path.clone();

    let outcome = match compile(compiler, details).await {
        Ok((duration, bytes)) => {
            JobOutcome::compiled(source, output_path, duration, bytes, started.elapsed())
        }
        Err(failure) => JobOutcome::failed(source, output_path, failure, started.elapsed()),
    };

    finish(reporter.as_ref(), &signal, &outcome);
    outcome
}

/// Create the destination directory, render, and write the output.
async fn compile(
    compiler: Arc<dyn Compiler>,
    details: JobDetails,
) -> Result<(Duration, usize), CompileFailure> {
    let JobDetails { source, full_output_path, options, .. } = details;

    if let Some(parent) = full_output_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            CompileFailure::io(&source, &format!("cannot create {}", parent.display()), &e)
        })?;
    }

    let rendered = tokio::task::spawn_blocking(move || compiler.render(&options))
        .await
        .map_err(|e| CompileFailure::new(&source, format!("compiler task failed: {}", e)))??;

    tokio::fs::write(&full_output_path, rendered.css.as_bytes()).await.map_err(|e| {
        CompileFailure::io(&source, &format!("cannot write {}", full_output_path.display()), &e)
    })?;

    tracing::debug!(output = %full_output_path.display(), bytes = rendered.css.len(), "wrote output");
    Ok((rendered.duration, rendered.css.len()))
}

fn finish(reporter: &dyn Reporter, signal: &FailureSignal, outcome: &JobOutcome) {
    reporter.report(outcome);
    if let Some(failure) = outcome.failure() {
        signal.raise(failure.clone());
    }
}
