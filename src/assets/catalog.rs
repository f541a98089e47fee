//! Asset catalog: tracks directories of non-stylesheet files (images, fonts)
//! that compiled stylesheets reference, and resolves their URLs.

use glob::{glob, Pattern};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::http::http_join;
use crate::options::{AssetOptions, CompileOptions};

/// Ignore patterns applied to every registered asset directory.
///
/// Scripts and stylesheets live next to images and fonts in most projects
/// but are never assets themselves.
pub const DEFAULT_ASSET_IGNORES: &[&str] = &["**/*.js", "**/*.s[ac]ss"];

/// Error raised by an asset catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// An ignore pattern failed to compile
    #[error("invalid asset ignore pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// Listing an asset directory failed
    #[error("failed to list assets in {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

/// A directory registered with the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSource {
    /// Absolute directory path
    pub directory: PathBuf,
    /// Glob patterns (relative to `directory`) excluded from the catalog
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl AssetSource {
    /// Create a source that ignores scripts and stylesheets.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ignore: DEFAULT_ASSET_IGNORES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Replace the ignore patterns.
    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    fn patterns(&self) -> Result<Vec<Pattern>, CatalogError> {
        self.ignore
            .iter()
            .map(|p| Pattern::new(p).map_err(|e| CatalogError::InvalidPattern(p.clone(), e)))
            .collect()
    }
}

/// An asset file known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// URL the file is served from
    pub url: String,
}

/// Catalog of asset directories bound to one job's options.
///
/// Registered sources are recorded in the job's `assets.sources`, so a
/// compiler receives them along with the rest of the options.
pub trait AssetCatalog: Send {
    /// Register an asset directory.
    fn add_source(&mut self, source: AssetSource) -> Result<(), CatalogError>;

    /// Options as currently configured.
    fn options(&self) -> &CompileOptions;

    /// Mutable access for configuration hooks.
    fn options_mut(&mut self) -> &mut CompileOptions;
}

/// Catalog that scans registered directories on disk.
#[derive(Debug, Clone, Default)]
pub struct DirectoryCatalog {
    options: CompileOptions,
}

impl DirectoryCatalog {
    /// Create a catalog over a job's options.
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Consume the catalog, returning the final options.
    pub fn into_options(self) -> CompileOptions {
        self.options
    }

    /// Registered sources.
    pub fn sources(&self) -> &[AssetSource] {
        self.options.assets.as_ref().map(|a| a.sources.as_slice()).unwrap_or(&[])
    }

    /// List every asset file in the registered directories, with its URL.
    ///
    /// URLs are `http_prefix` (or `/`) joined with the file's path relative
    /// to its source directory.
    pub fn entries(&self) -> Result<Vec<AssetEntry>, CatalogError> {
        let prefix = self
            .options
            .assets
            .as_ref()
            .and_then(|a| a.urls.as_ref())
            .and_then(|u| u.http_prefix.clone())
            .unwrap_or_else(|| "/".to_string());

        let mut entries = Vec::new();
        for source in self.sources() {
            let patterns = source.patterns()?;
            for path in list_files(&source.directory)? {
                let relative = path.strip_prefix(&source.directory).unwrap_or(&path);
                if patterns.iter().any(|p| p.matches_path(relative)) {
                    continue;
                }
                let url = http_join(&[prefix.as_str(), &relative.to_string_lossy()]);
                entries.push(AssetEntry { path, url });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

impl AssetCatalog for DirectoryCatalog {
    fn add_source(&mut self, source: AssetSource) -> Result<(), CatalogError> {
        source.patterns()?;

        if !source.directory.is_dir() {
            tracing::warn!(
                directory = %source.directory.display(),
                "asset directory does not exist, skipping"
            );
            return Ok(());
        }

        let assets = self.options.assets.get_or_insert_with(AssetOptions::default);
        if !assets.sources.contains(&source) {
            assets.sources.push(source);
        }
        Ok(())
    }

    fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut CompileOptions {
        &mut self.options
    }
}

/// All regular files below `dir`.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let pattern = Path::new(&Pattern::escape(&dir.to_string_lossy())).join("**").join("*");
    let paths = glob(&pattern.to_string_lossy()).map_err(|e| {
        CatalogError::Io(dir.to_path_buf(), std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| CatalogError::Io(dir.to_path_buf(), std::io::Error::from(e)))?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}
