//! Build command implementations (build, list)

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use super::{ProjectArgs, EXIT_ERROR, EXIT_SUCCESS};
use crate::assets::{AssetCatalog, AssetSource, DirectoryCatalog};
use crate::build::{BuildContext, BuildPipeline};
use crate::compiler::LightningCompiler;
use crate::config::{
    default_settings, find_config_from, load_config, merge_cli_overrides, ConfigError,
};
use crate::options::AssetUrlOptions;

/// Load configuration and validate it into a build context.
///
/// The project root is the directory holding stylebuild.toml, or the
/// current directory when there is none.
fn load_context(args: &ProjectArgs, verbose: Option<bool>) -> Result<BuildContext, ConfigError> {
    let cwd = std::env::current_dir()?;
    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_from(cwd.clone()),
    };

    let mut settings = match &config_path {
        Some(path) => load_config(Some(path.as_path()))?,
        None => default_settings(),
    };
    merge_cli_overrides(&mut settings, &args.overrides(verbose));

    let project_root = config_path
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or(cwd);

    match &config_path {
        Some(path) => tracing::debug!(config = %path.display(), "using config"),
        None => tracing::debug!("no stylebuild.toml found, using defaults"),
    }

    BuildContext::new(&settings, project_root)
}

/// Run the build command
pub fn run_build(args: &ProjectArgs, verbose: bool, dry_run: bool, force: bool) -> ExitCode {
    let context = match load_context(args, verbose.then_some(true)) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let out_dir = context.out_dir().to_path_buf();
    let mut pipeline =
        BuildPipeline::new(context, Arc::new(LightningCompiler::new())).with_force(force);

    if dry_run {
        println!("Dry run - would build:");
        for root in pipeline.context().source_roots() {
            println!("  Source: {}", root.display());
        }
        println!("  Output: {}", out_dir.display());

        return match pipeline.plan() {
            Ok(jobs) => {
                println!("  Jobs: {}", jobs.len());
                for job in &jobs {
                    println!("    - {} => {}", job.source.path().display(), job.output_path.display());
                }
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("  Error discovering sources: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut failures = pipeline.subscribe_failures();
    let result = runtime.block_on(pipeline.build());

    let mut fatal = 0usize;
    while let Ok(failure) = failures.try_recv() {
        tracing::debug!(file = %failure.file.display(), "fatal compile failure: {}", failure.message);
        fatal += 1;
    }

    match result {
        Ok(report) if report.is_success() && fatal == 0 => {
            println!("{}", report.summary());
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(report) => {
            eprintln!("{}", report.summary());
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the list command
pub fn run_list(args: &ProjectArgs, assets: bool) -> ExitCode {
    let context = match load_context(args, None) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let pipeline = BuildPipeline::new(context, Arc::new(LightningCompiler::new()));

    let sets = match pipeline.discover() {
        Ok(sets) => sets,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    for set in &sets {
        println!("{} ({} entry points)", set.root.display(), set.len());
        for file in &set.files {
            println!("  {}", file.relative.display());
        }
    }

    match pipeline.plan() {
        Ok(jobs) => {
            println!("\nJobs ({}):", jobs.len());
            for job in &jobs {
                println!("  {} => {}", job.source.path().display(), job.output_path.display());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    if assets {
        match list_assets(&pipeline) {
            Ok(entries) => {
                println!("\nAssets ({}):", entries.len());
                for (path, url) in entries {
                    println!("  {} => {}", path.display(), url);
                }
            }
            Err(e) => {
                eprintln!("Error listing assets: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Asset files and their URLs, as the catalog of a job would see them.
fn list_assets(
    pipeline: &BuildPipeline,
) -> Result<Vec<(PathBuf, String)>, crate::assets::CatalogError> {
    let mut options = pipeline.context().options().clone();
    let http_prefix = pipeline.context().assets().http_prefix.clone();
    options.assets.get_or_insert_with(Default::default).urls =
        Some(AssetUrlOptions { http_prefix, relative_to: None });

    let mut catalog = DirectoryCatalog::new(options);
    for dir in pipeline.overlay().directories() {
        catalog.add_source(AssetSource::new(dir))?;
    }

    Ok(catalog.entries()?.into_iter().map(|entry| (entry.path, entry.url)).collect())
}
