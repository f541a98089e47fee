//! Configuration schema types for `stylebuild.toml`
//!
//! Defines the structure and validation rules for stylebuild project configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::options::CompileOptions;

/// Project layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Source roots scanned for entry points, in order
    #[serde(default = "default_sources")]
    pub sources: Vec<PathBuf>,
    /// Output root (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<PathBuf>,
    /// Stylesheet extension of entry points, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { sources: default_sources(), out: None, extension: default_extension() }
    }
}

fn default_sources() -> Vec<PathBuf> {
    vec![PathBuf::from("styles")]
}

fn default_extension() -> String {
    "scss".to_string()
}

/// Build behavior section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Print a line for every compiled or failed job
    #[serde(default)]
    pub verbose: bool,
    /// Skip the pass when the source digest is unchanged
    #[serde(default)]
    pub digest: bool,
}

/// One path or a list of paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathList {
    /// A single path
    One(PathBuf),
    /// Several paths
    Many(Vec<PathBuf>),
}

impl Default for PathList {
    fn default() -> Self {
        PathList::Many(Vec::new())
    }
}

impl PathList {
    /// Flatten into a list.
    pub fn to_vec(&self) -> Vec<PathBuf> {
        match self {
            PathList::One(path) => vec![path.clone()],
            PathList::Many(paths) => paths.clone(),
        }
    }

    /// Whether no path is configured.
    pub fn is_empty(&self) -> bool {
        matches!(self, PathList::Many(paths) if paths.is_empty())
    }
}

/// Asset pipeline section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Asset directories registered with the catalog
    #[serde(default)]
    pub dirs: PathList,
    /// Prefix for generated asset URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_prefix: Option<String>,
    /// Compute asset URLs relative to each output file's directory
    #[serde(default)]
    pub relative: bool,
}

/// Root configuration structure for stylebuild.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,
    /// Build behavior
    #[serde(default)]
    pub build: BuildConfig,
    /// Asset pipeline
    #[serde(default)]
    pub assets: AssetsConfig,
    /// Base compiler options cloned into every job
    #[serde(default)]
    pub options: CompileOptions,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "project.extension")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stylebuild.toml: '{}' {}", self.field, self.message)
    }
}

impl Settings {
    /// Validate the configuration and return any errors
    ///
    /// A missing output root and forbidden compiler options are reported
    /// separately, when the build context is constructed.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.sources.is_empty() {
            errors.push(ConfigValidationError {
                field: "project.sources".to_string(),
                message: "must contain at least one source root".to_string(),
            });
        }

        let extension = &self.project.extension;
        if extension.is_empty() || extension.starts_with('.') || extension.contains('/') {
            errors.push(ConfigValidationError {
                field: "project.extension".to_string(),
                message: "must be a bare file extension such as \"scss\"".to_string(),
            });
        }

        if let Some(out) = &self.project.out {
            if self.project.sources.iter().any(|src| src == out) {
                errors.push(ConfigValidationError {
                    field: "project.out".to_string(),
                    message: "must not be one of the source roots".to_string(),
                });
            }
        }

        if let Some(prefix) = &self.assets.http_prefix {
            if prefix.is_empty() {
                errors.push(ConfigValidationError {
                    field: "assets.http_prefix".to_string(),
                    message: "must not be empty when set".to_string(),
                });
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let settings: Settings = toml::from_str("[project]\nout = \"dist\"").unwrap();
        assert_eq!(settings.project.out, Some(PathBuf::from("dist")));
        assert_eq!(settings.project.sources, vec![PathBuf::from("styles")]);
        assert_eq!(settings.project.extension, "scss");
        assert!(!settings.build.verbose);
        assert!(settings.assets.dirs.is_empty());
        assert!(settings.is_valid());
    }

    #[test]
    fn test_parse_full() {
        let settings: Settings = toml::from_str(
            r#"
[project]
sources = ["app/styles", "vendor/styles"]
out = "public/css"
extension = "css"

[build]
verbose = true
digest = true

[assets]
dirs = ["public/images", "public/fonts"]
http_prefix = "/static"
relative = true

[options]
output_style = "compressed"
"#,
        )
        .unwrap();

        assert_eq!(settings.project.sources.len(), 2);
        assert!(settings.build.verbose);
        assert!(settings.build.digest);
        assert_eq!(settings.assets.dirs.to_vec().len(), 2);
        assert_eq!(settings.assets.http_prefix.as_deref(), Some("/static"));
        assert!(settings.assets.relative);
        assert_eq!(settings.options.output_style, crate::options::OutputStyle::Compressed);
    }

    #[test]
    fn test_asset_dirs_single_string() {
        let settings: Settings = toml::from_str("[assets]\ndirs = \"images\"").unwrap();
        assert_eq!(settings.assets.dirs, PathList::One(PathBuf::from("images")));
        assert_eq!(settings.assets.dirs.to_vec(), vec![PathBuf::from("images")]);
    }

    #[test]
    fn test_validate_extension() {
        let mut settings = Settings::default();
        settings.project.extension = ".scss".to_string();
        let errors = settings.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "project.extension");
    }

    #[test]
    fn test_validate_empty_sources() {
        let mut settings = Settings::default();
        settings.project.sources.clear();
        assert!(!settings.is_valid());
    }

    #[test]
    fn test_validate_out_is_source() {
        let mut settings = Settings::default();
        settings.project.out = Some(PathBuf::from("styles"));
        let errors = settings.validate();
        assert_eq!(errors[0].field, "project.out");
        assert!(errors[0].to_string().contains("stylebuild.toml"));
    }
}
