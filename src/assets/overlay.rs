//! Asset resolution overlay.
//!
//! Injects asset metadata into every job's options before it is compiled:
//! the URL prefix, the URL directory the job's output is served from, the
//! build directory, and the registered asset directories.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::catalog::{AssetCatalog, AssetSource, DirectoryCatalog};
use super::http::{http_join, url_dirname};
use crate::build::hook::{HookResult, JobDetails, OptionsHook};
use crate::compiler::Compiler;
use crate::config::AssetsConfig;
use crate::options::AssetOptions;

/// Per-job catalog customization, run after the overlay's own injection.
pub type ConfigureCatalog =
    dyn Fn(&mut dyn AssetCatalog, &dyn Compiler, &JobDetails) -> HookResult + Send + Sync;

/// Options hook wiring the asset catalog into each job.
#[derive(Clone, Default)]
pub struct AssetOverlay {
    /// Asset directories, already resolved to absolute paths
    directories: Vec<PathBuf>,
    /// URL prefix for generated asset URLs
    http_prefix: Option<String>,
    /// Whether `relative_to` is computed per job
    relative: bool,
    /// Escape hatch for further catalog customization
    configure: Option<Arc<ConfigureCatalog>>,
}

impl fmt::Debug for AssetOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetOverlay")
            .field("directories", &self.directories)
            .field("http_prefix", &self.http_prefix)
            .field("relative", &self.relative)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

impl AssetOverlay {
    /// Create an overlay with nothing configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an overlay from the `[assets]` section, resolving directories
    /// against `project_root`.
    pub fn from_config(config: &AssetsConfig, project_root: &Path) -> Self {
        let directories = config
            .dirs
            .to_vec()
            .into_iter()
            .map(|dir| if dir.is_absolute() { dir } else { project_root.join(dir) })
            .collect();

        Self {
            directories,
            http_prefix: config.http_prefix.clone(),
            relative: config.relative,
            configure: None,
        }
    }

    /// Add an asset directory.
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Set the URL prefix.
    pub fn with_http_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.http_prefix = Some(prefix.into());
        self
    }

    /// Enable per-job `relative_to` computation.
    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    /// Install a catalog configuration hook.
    pub fn with_configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut dyn AssetCatalog, &dyn Compiler, &JobDetails) -> HookResult + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }

    /// Registered asset directories.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Whether any asset setting is configured.
    pub fn is_configured(&self) -> bool {
        !self.directories.is_empty()
            || self.http_prefix.is_some()
            || self.relative
            || self.configure.is_some()
    }
}

impl OptionsHook for AssetOverlay {
    fn name(&self) -> &str {
        "assets"
    }

    fn prepare(&self, details: &mut JobDetails, compiler: &dyn Compiler) -> HookResult {
        if !self.is_configured() && details.options.assets.is_none() {
            return Ok(());
        }

        let mut options = details.options.clone();
        let assets = options.assets.get_or_insert_with(AssetOptions::default);

        if self.http_prefix.is_some() || self.relative {
            let relative_to = self.relative.then(|| {
                let root = assets.http_root.as_deref().unwrap_or("/");
                http_join(&[root, url_dirname(&details.output_path).as_str()])
            });

            let urls = assets.urls.get_or_insert_with(Default::default);
            if let Some(prefix) = &self.http_prefix {
                urls.http_prefix = Some(prefix.clone());
            }
            if let Some(relative_to) = relative_to {
                urls.relative_to = Some(relative_to);
            }
        }

        assets.build_dir = Some(details.dest_dir.clone());

        let mut catalog = DirectoryCatalog::new(options);
        for dir in &self.directories {
            catalog.add_source(AssetSource::new(dir))?;
        }

        if let Some(configure) = &self.configure {
            configure(&mut catalog, compiler, details)?;
        }

        details.options = catalog.into_options();
        Ok(())
    }
}
