//! Configuration loading and discovery for `stylebuild.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::Settings;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "stylebuild.toml";

/// Configuration error
///
/// Every variant is fatal for the build step: it is raised before any
/// source is enumerated or compiled.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse stylebuild.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// No output root configured
    #[error("Expected an output directory (set [project] out or pass --out)")]
    MissingOutputDir,
    /// An engine-owned compiler option was set in the base options
    #[error("The compiler option '{0}' cannot be set explicitly")]
    ForbiddenOption(String),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override source roots
    pub sources: Option<Vec<PathBuf>>,
    /// Override entry-point extension
    pub extension: Option<String>,
    /// Enable verbose reporting
    pub verbose: Option<bool>,
}

/// Find stylebuild.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    find_config_from(cwd)
}

/// Find stylebuild.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a stylebuild.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration (which has no output root).
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_settings()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<Settings, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(contents)?;

    let errors = settings.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(settings)
}

/// Configuration used when no stylebuild.toml is found.
pub fn default_settings() -> Settings {
    Settings::default()
}

/// Merge CLI overrides into a configuration.
pub fn merge_cli_overrides(settings: &mut Settings, overrides: &CliOverrides) {
    if let Some(ref out) = overrides.out {
        settings.project.out = Some(out.clone());
    }

    if let Some(ref sources) = overrides.sources {
        if !sources.is_empty() {
            settings.project.sources = sources.clone();
        }
    }

    if let Some(ref extension) = overrides.extension {
        settings.project.extension = extension.trim_start_matches('.').to_string();
    }

    if let Some(verbose) = overrides.verbose {
        settings.build.verbose = verbose;
    }
}
