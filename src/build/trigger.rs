//! Rebuild triggers.
//!
//! A [`RebuildTrigger`] decides whether a build pass has to run at all and
//! is told how the pass went afterwards. [`AlwaysRebuild`] runs every pass;
//! [`DigestTrigger`] skips a pass when nothing under the source roots has
//! changed since the last successful one.
//!
//! The digest covers every file under every root (partials included), keyed
//! by root-relative path, and is stored in `.stylebuild-digest.json` inside
//! the output directory.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build::result::BuildReport;

/// Digest file name, stored in the output directory.
pub const DIGEST_FILENAME: &str = ".stylebuild-digest.json";

/// Current digest file format version.
const DIGEST_VERSION: u32 = 2;

/// Error while computing or persisting a digest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TriggerError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid glob pattern built from a source root
    #[error("Invalid source root pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
}

/// Decides whether a build pass runs.
pub trait RebuildTrigger: Send {
    /// Check whether the pass must run.
    fn needs_rebuild(&mut self, roots: &[PathBuf], out_dir: &Path) -> Result<bool, TriggerError>;

    /// Record the result of a pass that ran.
    fn record(&mut self, out_dir: &Path, report: &BuildReport) -> Result<(), TriggerError>;

    /// Run the next passes regardless of any recorded state. Triggers
    /// without recorded state ignore this.
    fn set_force(&mut self, _force: bool) {}
}

/// Runs every pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysRebuild;

impl RebuildTrigger for AlwaysRebuild {
    fn needs_rebuild(&mut self, _roots: &[PathBuf], _out_dir: &Path) -> Result<bool, TriggerError> {
        Ok(true)
    }

    fn record(&mut self, _out_dir: &Path, _report: &BuildReport) -> Result<(), TriggerError> {
        Ok(())
    }
}

/// On-disk digest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRecord {
    /// Format version
    pub version: u32,
    /// Combined digest, hex encoded
    pub digest: String,
    /// Number of files that went into the digest
    pub files: usize,
    /// Outputs written by the recorded pass, relative to the output root
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
}

impl DigestRecord {
    /// Outputs of the recorded pass that no longer exist under `out_dir`.
    pub fn missing_outputs(&self, out_dir: &Path) -> Vec<&PathBuf> {
        self.outputs.iter().filter(|output| !out_dir.join(output).is_file()).collect()
    }
}

/// Skips a pass when the source digest matches the last successful pass.
#[derive(Debug, Default, Clone)]
pub struct DigestTrigger {
    /// Run every pass regardless of the stored digest
    force: bool,
    /// Extra input mixed into the digest (e.g. serialized base options)
    salt: String,
    /// Digest computed by the last `needs_rebuild` call
    pending: Option<DigestRecord>,
}

impl DigestTrigger {
    /// Create a digest trigger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set force mode (run the pass regardless of the stored digest).
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Mix extra input into the digest, so configuration changes also
    /// trigger a rebuild.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    /// Load the stored record from `out_dir`. Returns `Ok(None)` if there is none.
    pub fn load(out_dir: &Path) -> Result<Option<DigestRecord>, TriggerError> {
        let path = out_dir.join(DIGEST_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let record: DigestRecord = serde_json::from_str(&fs::read_to_string(path)?)?;
        if record.version != DIGEST_VERSION {
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Compute the digest of everything under `roots`.
    pub fn compute(&self, roots: &[PathBuf], out_dir: &Path) -> Result<DigestRecord, TriggerError> {
        let mut files = Vec::new();
        for (index, root) in roots.iter().enumerate() {
            for path in list_files(root)? {
                if path.starts_with(out_dir) {
                    continue;
                }
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                files.push((index, relative, path));
            }
        }
        files.sort();

        let hashes = files
            .par_iter()
            .map(|(index, relative, path)| {
                let contents = fs::read(path)?;
                let key = format!("{}:{}", index, relative.to_string_lossy());
                Ok((fnv1a_hash(key.as_bytes()), fnv1a_hash(&contents)))
            })
            .collect::<Result<Vec<_>, std::io::Error>>()?;

        let mut combined = Vec::with_capacity(self.salt.len() + hashes.len() * 16);
        combined.extend_from_slice(self.salt.as_bytes());
        for (key, contents) in &hashes {
            combined.extend_from_slice(&key.to_le_bytes());
            combined.extend_from_slice(&contents.to_le_bytes());
        }

        Ok(DigestRecord {
            version: DIGEST_VERSION,
            digest: format!("{:016x}", fnv1a_hash(&combined)),
            files: hashes.len(),
            outputs: Vec::new(),
        })
    }
}

impl RebuildTrigger for DigestTrigger {
    fn needs_rebuild(&mut self, roots: &[PathBuf], out_dir: &Path) -> Result<bool, TriggerError> {
        let current = self.compute(roots, out_dir)?;

        let unchanged = !self.force
            && out_dir.is_dir()
            && Self::load(out_dir)?.is_some_and(|stored| {
                let missing = stored.missing_outputs(out_dir);
                if !missing.is_empty() {
                    tracing::debug!(missing = missing.len(), "recorded outputs are missing");
                }
                stored.digest == current.digest && missing.is_empty()
            });

        tracing::debug!(digest = %current.digest, files = current.files, unchanged, "source digest");
        self.pending = Some(current);
        Ok(!unchanged)
    }

    fn set_force(&mut self, force: bool) {
        self.force = force;
    }

    fn record(&mut self, out_dir: &Path, report: &BuildReport) -> Result<(), TriggerError> {
        let path = out_dir.join(DIGEST_FILENAME);

        match self.pending.take() {
            Some(mut record) if report.is_success() => {
                record.outputs = report.all_outputs().into_iter().cloned().collect();
                fs::create_dir_all(out_dir)?;
                fs::write(path, serde_json::to_string_pretty(&record)?)?;
            }
            _ => {
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

/// Every regular file under `root`. A missing root has no files.
fn list_files(root: &Path) -> Result<Vec<PathBuf>, TriggerError> {
    let pattern = Path::new(&glob::Pattern::escape(&root.to_string_lossy())).join("**").join("*");
    let pattern = pattern.to_string_lossy().to_string();
    let paths = glob::glob(&pattern).map_err(|e| TriggerError::InvalidPattern(pattern.clone(), e))?;

    Ok(paths.filter_map(Result::ok).filter(|p| p.is_file()).collect())
}

/// FNV-1a hash algorithm.
fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
