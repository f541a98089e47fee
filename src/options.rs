//! Compiler option sets.
//!
//! `CompileOptions` is the option record handed to a [`Compiler`](crate::compiler::Compiler)
//! for a single job. The base set comes from the `[options]` table of
//! `stylebuild.toml`; every job receives its own deep copy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::assets::AssetSource;

/// Option keys the engine sets itself for every job.
///
/// Both snake_case and the camelCase spelling used by other sass tooling are
/// rejected when they appear in a base option set.
pub const FORBIDDEN_OPTIONS: &[&str] = &["file", "data", "out_file", "outFile"];

/// Output formatting of the compiled stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Human-readable output
    #[default]
    Expanded,
    /// Minified output
    Compressed,
}

/// Options passed to the stylesheet compiler for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Entry point to compile. Set per job by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Inline stylesheet source. Takes precedence over `file` when set by a generator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Output target. Set per job by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_file: Option<PathBuf>,
    /// Extra directories the compiler searches for imports
    pub include_paths: Vec<PathBuf>,
    /// Output formatting
    pub output_style: OutputStyle,
    /// Whether a source map should be produced alongside the output
    pub source_map: bool,
    /// Asset pipeline settings, injected by the asset overlay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<AssetOptions>,
    /// Compiler-specific keys passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CompileOptions {
    /// Names of engine-owned keys present in this option set.
    ///
    /// A base option set is only valid when this list is empty.
    pub fn forbidden_keys(&self) -> Vec<&'static str> {
        let mut found = Vec::new();
        if self.file.is_some() {
            found.push("file");
        }
        if self.data.is_some() {
            found.push("data");
        }
        if self.out_file.is_some() {
            found.push("out_file");
        }
        for key in FORBIDDEN_OPTIONS {
            if self.extra.contains_key(*key) && !found.contains(key) {
                found.push(key);
            }
        }
        found
    }

    /// Look up a pass-through option by key.
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Set a pass-through option.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Asset pipeline sub-configuration of a job's options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetOptions {
    /// Root URL the site is served from (defaults to `/` when computing relative roots)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_root: Option<String>,
    /// Directory the current build pass writes into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
    /// URL generation settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<AssetUrlOptions>,
    /// Asset directories registered with the catalog for this job
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<AssetSource>,
}

/// How asset URLs are generated for a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetUrlOptions {
    /// String prefixed onto every generated asset URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_prefix: Option<String>,
    /// URL directory asset references are made relative to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_to: Option<String>,
}
