//! Entry-point discovery for the build system.
//!
//! Finds the stylesheets under each source root that compile to their own
//! output. Partials (base name starting with `_`) are only ever imported and
//! are skipped at any depth.

use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build::job::SourceFile;

/// Error during source discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// IO error during file enumeration
    #[error("IO error during discovery: {0}")]
    Io(#[from] std::io::Error),
}

/// Entry points found under one source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    /// Source root as configured
    pub root: PathBuf,
    /// Entry points, sorted by relative path
    pub files: Vec<SourceFile>,
}

impl SourceSet {
    /// Number of entry points in this set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the root holds no entry points.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Discover the entry points under every source root.
///
/// # Arguments
/// - `roots` - Source roots, in configured order
/// - `extension` - Stylesheet extension without the dot
///
/// # Returns
/// One [`SourceSet`] per root, in the same order. A root that does not
/// exist yields an empty set.
pub fn discover_entry_points(
    roots: &[PathBuf],
    extension: &str,
) -> Result<Vec<SourceSet>, DiscoveryError> {
    roots
        .iter()
        .map(|root| {
            let files = discover_files(root, extension)?
                .into_iter()
                .map(|path| SourceFile::new(root.clone(), strip_root_prefix(root, &path)))
                .collect();
            Ok(SourceSet { root: root.clone(), files })
        })
        .collect()
}

/// Discover non-partial files with `extension` under `root`, sorted.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let full_pattern = Path::new(&escaped_root).join("**").join(format!("*.{}", extension));
    let pattern_str = full_pattern.to_string_lossy();

    let paths =
        glob(&pattern_str).map_err(|e| DiscoveryError::InvalidPattern(pattern_str.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() && !is_partial(&path) {
                    files.push(path);
                }
            }
            Err(e) => {
                tracing::warn!(path = %e.path().display(), "skipping unreadable path: {}", e.error());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Check if a path names a partial stylesheet.
pub fn is_partial(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|name| name.starts_with('_'))
}

/// Make `path` relative to `root`.
///
/// Trailing separators on `root` are ignored. A path outside `root` is
/// returned unchanged.
pub fn strip_root_prefix(root: &Path, path: &Path) -> PathBuf {
    let root_str = root.to_string_lossy();
    let trimmed = root_str.trim_end_matches(std::path::is_separator);
    let root = if trimmed.is_empty() { root } else { Path::new(trimmed) };

    path.strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}
