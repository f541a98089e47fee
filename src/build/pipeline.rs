//! Build pipeline orchestration.
//!
//! The pipeline wires one build pass together: the rebuild trigger decides
//! whether to run, entry points are discovered and expanded into jobs, and
//! the orchestrator compiles them with the asset overlay and any extra
//! hooks applied.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::assets::AssetOverlay;
use crate::build::context::BuildContext;
use crate::build::discovery::{discover_entry_points, DiscoveryError, SourceSet};
use crate::build::hook::OptionsHook;
use crate::build::job::{expand_jobs, CompileJob};
use crate::build::orchestrator::Orchestrator;
use crate::build::progress::{ConsoleReporter, Reporter};
use crate::build::result::BuildReport;
use crate::build::signal::FailureSignal;
use crate::build::trigger::{AlwaysRebuild, DigestTrigger, RebuildTrigger, TriggerError};
use crate::compiler::{CompileFailure, Compiler};
use crate::config::ConfigError;

/// Error that aborts a whole build pass.
///
/// Per-job compile failures are not errors of the pass; they are reported
/// in the [`BuildReport`] and on the failure channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    /// Rebuild trigger error
    #[error("Rebuild check failed: {0}")]
    Trigger(#[from] TriggerError),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build pipeline for executing build passes.
pub struct BuildPipeline {
    /// Validated build context
    context: Arc<BuildContext>,
    /// Stylesheet compiler shared by every job
    compiler: Arc<dyn Compiler>,
    /// Decides whether a pass runs
    trigger: Box<dyn RebuildTrigger>,
    /// Receives every settled job
    reporter: Arc<dyn Reporter>,
    /// Asset overlay, always the first options hook
    overlay: AssetOverlay,
    /// Additional options hooks, run after the overlay
    hooks: Vec<Arc<dyn OptionsHook>>,
    /// Fatal-failure channel
    signal: FailureSignal,
}

impl std::fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPipeline")
            .field("context", &self.context)
            .field("compiler", &self.compiler.name())
            .field("overlay", &self.overlay)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl BuildPipeline {
    /// Create a new build pipeline.
    ///
    /// The asset overlay is built from the context's `[assets]` settings,
    /// the reporter prints when the context is verbose, and the digest
    /// trigger is used when the context enables it.
    pub fn new(context: BuildContext, compiler: Arc<dyn Compiler>) -> Self {
        let overlay = AssetOverlay::from_config(context.assets(), context.project_root());
        let reporter = Arc::new(ConsoleReporter::new().with_verbose(context.is_verbose()));
        let trigger: Box<dyn RebuildTrigger> = if context.uses_digest() {
            Box::new(digest_trigger(&context))
        } else {
            Box::new(AlwaysRebuild)
        };

        Self {
            context: Arc::new(context),
            compiler,
            trigger,
            reporter,
            overlay,
            hooks: Vec::new(),
            signal: FailureSignal::new(),
        }
    }

    /// Replace the rebuild trigger.
    pub fn with_trigger<T: RebuildTrigger + 'static>(mut self, trigger: T) -> Self {
        self.trigger = Box::new(trigger);
        self
    }

    /// Run the next pass even if the trigger would skip it. Applies to the
    /// trigger currently installed, whichever it is; the digest is still
    /// recorded afterwards.
    pub fn with_force(mut self, force: bool) -> Self {
        self.trigger.set_force(force);
        self
    }

    /// Replace the reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the asset overlay.
    pub fn with_overlay(mut self, overlay: AssetOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Append an options hook, run after the asset overlay.
    pub fn with_hook(mut self, hook: Arc<dyn OptionsHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Get the asset overlay.
    pub fn overlay(&self) -> &AssetOverlay {
        &self.overlay
    }

    /// Subscribe to the fatal-failure channel. Every failed job of every
    /// later pass is sent here.
    pub fn subscribe_failures(&self) -> UnboundedReceiver<CompileFailure> {
        self.signal.subscribe()
    }

    /// Discover entry points under every source root.
    pub fn discover(&self) -> Result<Vec<SourceSet>, BuildError> {
        Ok(discover_entry_points(self.context.source_roots(), self.context.extension())?)
    }

    /// Expand the discovered entry points into jobs without compiling.
    pub fn plan(&self) -> Result<Vec<CompileJob>, BuildError> {
        let sets = self.discover()?;
        Ok(expand_jobs(&sets, self.context.options(), self.context.generator()))
    }

    /// Output paths the current plan would write, resolved against the output root.
    pub fn planned_outputs(&self) -> Result<Vec<PathBuf>, BuildError> {
        Ok(self.plan()?.iter().map(|job| self.context.out_dir().join(&job.output_path)).collect())
    }

    fn orchestrator(&self) -> Orchestrator {
        let overlay: Arc<dyn OptionsHook> = Arc::new(self.overlay.clone());
        self.hooks.iter().fold(
            Orchestrator::new(Arc::clone(&self.compiler), self.context.out_dir())
                .with_reporter(Arc::clone(&self.reporter))
                .with_signal(self.signal.clone())
                .with_hook(overlay),
            |orchestrator, hook| orchestrator.with_hook(Arc::clone(hook)),
        )
    }

    /// Run one build pass.
    ///
    /// Returns once every job has settled. Compile failures are reported in
    /// the returned [`BuildReport`]; only configuration, discovery and
    /// trigger problems abort the pass with an error.
    pub async fn build(&mut self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let out_dir = self.context.out_dir().to_path_buf();

        if !self.trigger.needs_rebuild(self.context.source_roots(), &out_dir)? {
            tracing::info!(out = %out_dir.display(), "sources unchanged, skipping build");
            return Ok(BuildReport::up_to_date().with_duration(start.elapsed()));
        }

        let jobs = self.plan()?;
        tracing::info!(jobs = jobs.len(), out = %out_dir.display(), "starting build");

        let outcomes = self.orchestrator().run(jobs).await;
        let report = BuildReport::new(outcomes).with_duration(start.elapsed());

        self.trigger.record(&out_dir, &report)?;

        tracing::info!(
            compiled = report.success_count(),
            failed = report.failed_count(),
            elapsed_ms = report.total_duration.as_millis() as u64,
            "build finished"
        );
        Ok(report)
    }
}

/// Digest trigger salted with the base options and the `[assets]` settings
/// the overlay injects, so changing either rebuilds.
fn digest_trigger(context: &BuildContext) -> DigestTrigger {
    let salt = serde_json::to_string(&(context.options(), context.assets())).unwrap_or_default();
    DigestTrigger::new().with_salt(salt)
}
