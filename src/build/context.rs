//! Build context containing validated configuration for a build pass.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::build::job::{from_fn, Generator, IdentityGenerator, JobCollector, SourceFile};
use crate::config::{AssetsConfig, ConfigError, Settings};
use crate::options::CompileOptions;

/// Validated configuration for a build.
///
/// Construction is the only place configuration is checked: a missing output
/// root or an engine-owned compiler option in the base options fails here,
/// before anything is enumerated or compiled. The context is read-only
/// afterwards.
#[derive(Clone)]
pub struct BuildContext {
    /// Project root directory (where stylebuild.toml is located)
    project_root: PathBuf,
    /// Source roots, resolved to absolute paths, in configured order
    source_roots: Vec<PathBuf>,
    /// Output root, resolved to an absolute path
    out_dir: PathBuf,
    /// Entry-point extension without the dot
    extension: String,
    /// Base compiler options
    options: CompileOptions,
    /// Asset pipeline settings
    assets: AssetsConfig,
    /// Job expansion hook
    generator: Arc<dyn Generator>,
    /// Whether to run in verbose mode
    verbose: bool,
    /// Whether digest-based skipping is enabled
    digest: bool,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("project_root", &self.project_root)
            .field("source_roots", &self.source_roots)
            .field("out_dir", &self.out_dir)
            .field("extension", &self.extension)
            .field("options", &self.options)
            .field("assets", &self.assets)
            .field("verbose", &self.verbose)
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `settings` - The loaded configuration
    /// - `project_root` - Directory relative paths are resolved against
    pub fn new(settings: &Settings, project_root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let project_root = project_root.into();

        let out = settings.project.out.as_ref().ok_or(ConfigError::MissingOutputDir)?;

        if let Some(key) = settings.options.forbidden_keys().first() {
            return Err(ConfigError::ForbiddenOption(key.to_string()));
        }

        let errors = settings.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
        }

        let source_roots: Vec<PathBuf> =
            settings.project.sources.iter().map(|src| resolve_path(&project_root, src)).collect();
        let out_dir = resolve_path(&project_root, out);

        let mut options = settings.options.clone();
        options.include_paths =
            options.include_paths.iter().map(|p| resolve_path(&project_root, p)).collect();
        for root in &source_roots {
            if !options.include_paths.contains(root) {
                options.include_paths.push(root.clone());
            }
        }

        Ok(Self {
            source_roots,
            out_dir,
            extension: settings.project.extension.clone(),
            options,
            assets: settings.assets.clone(),
            generator: Arc::new(IdentityGenerator),
            verbose: settings.build.verbose,
            digest: settings.build.digest,
            project_root,
        })
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the source roots.
    pub fn source_roots(&self) -> &[PathBuf] {
        &self.source_roots
    }

    /// Get the output root.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Get the entry-point extension.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Get the base compiler options.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Get the asset pipeline settings.
    pub fn assets(&self) -> &AssetsConfig {
        &self.assets
    }

    /// Get the job generator.
    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether digest-based skipping is enabled.
    pub fn uses_digest(&self) -> bool {
        self.digest
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set digest-based skipping.
    pub fn with_digest(mut self, digest: bool) -> Self {
        self.digest = digest;
        self
    }

    /// Replace the job generator.
    pub fn with_generator<G: Generator + 'static>(mut self, generator: G) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Replace the job generator with a closure.
    pub fn with_generator_fn<F>(self, f: F) -> Self
    where
        F: Fn(&SourceFile, &Path, &CompileOptions, &mut JobCollector) + Send + Sync + 'static,
    {
        self.with_generator(from_fn(f))
    }
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_out(out: &str) -> Settings {
        let mut settings = Settings::default();
        settings.project.out = Some(PathBuf::from(out));
        settings
    }

    #[test]
    fn test_build_context_new() {
        let ctx = BuildContext::new(&settings_with_out("dist"), "/project").unwrap();

        assert_eq!(ctx.project_root(), Path::new("/project"));
        assert_eq!(ctx.out_dir(), Path::new("/project/dist"));
        assert_eq!(ctx.source_roots(), &[PathBuf::from("/project/styles")]);
        assert_eq!(ctx.extension(), "scss");
        assert!(!ctx.is_verbose());
        assert!(!ctx.uses_digest());
    }

    #[test]
    fn test_build_context_absolute_paths() {
        let mut settings = settings_with_out("/srv/www/css");
        settings.project.sources = vec![PathBuf::from("/shared/styles"), PathBuf::from("local")];
        let ctx = BuildContext::new(&settings, "/project").unwrap();

        assert_eq!(ctx.out_dir(), Path::new("/srv/www/css"));
        assert_eq!(
            ctx.source_roots(),
            &[PathBuf::from("/shared/styles"), PathBuf::from("/project/local")]
        );
    }

    #[test]
    fn test_missing_output_dir() {
        let result = BuildContext::new(&Settings::default(), "/project");
        assert!(matches!(result, Err(ConfigError::MissingOutputDir)));
    }

    #[test]
    fn test_forbidden_out_file() {
        let mut settings = settings_with_out("dist");
        settings.options.out_file = Some(PathBuf::from("all.css"));
        let result = BuildContext::new(&settings, "/project");
        assert!(matches!(result, Err(ConfigError::ForbiddenOption(key)) if key == "out_file"));
    }

    #[test]
    fn test_forbidden_file_and_data() {
        let mut settings = settings_with_out("dist");
        settings.options.data = Some("a {}".to_string());
        let result = BuildContext::new(&settings, "/project");
        assert!(matches!(result, Err(ConfigError::ForbiddenOption(key)) if key == "data"));

        let mut settings = settings_with_out("dist");
        settings.options.file = Some(PathBuf::from("a.scss"));
        let result = BuildContext::new(&settings, "/project");
        assert!(matches!(result, Err(ConfigError::ForbiddenOption(key)) if key == "file"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = settings_with_out("dist");
        settings.project.sources.clear();
        let result = BuildContext::new(&settings, "/project");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_build_context_with_verbose() {
        let ctx = BuildContext::new(&settings_with_out("dist"), "/project").unwrap().with_verbose(true);
        assert!(ctx.is_verbose());
    }

    #[test]
    fn test_settings_not_mutated() {
        let mut settings = settings_with_out("dist");
        settings.options.include_paths.push(PathBuf::from("vendor"));
        let before = settings.options.clone();
        let _ctx = BuildContext::new(&settings, "/project").unwrap();
        assert_eq!(settings.options, before);
    }

    #[test]
    fn test_include_paths_get_source_roots() {
        let mut settings = settings_with_out("dist");
        settings.options.include_paths.push(PathBuf::from("vendor"));
        let ctx = BuildContext::new(&settings, "/project").unwrap();
        assert_eq!(
            ctx.options().include_paths,
            vec![PathBuf::from("/project/vendor"), PathBuf::from("/project/styles")]
        );
    }
}
