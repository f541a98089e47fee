//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::CliOverrides;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// stylebuild - Compile stylesheet trees into an output directory
#[derive(Parser)]
#[command(name = "stylebuild")]
#[command(about = "stylebuild - Compile every stylesheet entry point under the source roots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Project selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Path to stylebuild.toml (default: search upward from the current directory)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Source root to scan (repeatable; replaces [project] sources)
    #[arg(long = "src", short = 's')]
    pub src: Vec<PathBuf>,

    /// Output directory (overrides [project] out)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Entry-point extension (overrides [project] extension)
    #[arg(long, short = 'e')]
    pub extension: Option<String>,
}

impl ProjectArgs {
    /// Convert into config overrides.
    pub fn overrides(&self, verbose: Option<bool>) -> CliOverrides {
        CliOverrides {
            out: self.out.clone(),
            sources: if self.src.is_empty() { None } else { Some(self.src.clone()) },
            extension: self.extension.clone(),
            verbose,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile every entry point
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Print a line for every compiled or failed stylesheet
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Show what would be compiled without compiling
        #[arg(long)]
        dry_run: bool,

        /// Rebuild even if the source digest is unchanged
        #[arg(long)]
        force: bool,
    },

    /// List entry points and the jobs they expand to
    List {
        #[command(flatten)]
        project: ProjectArgs,

        /// Also list files found in the configured asset directories
        #[arg(long)]
        assets: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { project, verbose, dry_run, force } => {
            build::run_build(&project, verbose, dry_run, force)
        }
        Commands::List { project, assets } => build::run_list(&project, assets),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_args() {
        let cli = Cli::try_parse_from([
            "stylebuild",
            "build",
            "--src",
            "app/styles",
            "--src",
            "vendor/styles",
            "--out",
            "dist",
            "--verbose",
            "--force",
        ])
        .unwrap();

        match cli.command {
            Commands::Build { project, verbose, dry_run, force } => {
                assert_eq!(project.src.len(), 2);
                assert_eq!(project.out, Some(PathBuf::from("dist")));
                assert!(verbose);
                assert!(force);
                assert!(!dry_run);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_overrides_without_src_keep_config_sources() {
        let args = ProjectArgs::default();
        let overrides = args.overrides(None);
        assert!(overrides.sources.is_none());
        assert!(overrides.verbose.is_none());
    }

    #[test]
    fn test_parse_list_args() {
        let cli = Cli::try_parse_from(["stylebuild", "list", "--assets", "-e", "css"]).unwrap();
        match cli.command {
            Commands::List { project, assets } => {
                assert!(assets);
                assert_eq!(project.extension.as_deref(), Some("css"));
            }
            _ => panic!("expected list command"),
        }
    }
}
