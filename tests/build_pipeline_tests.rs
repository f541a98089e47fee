//! Build pipeline integration tests
//!
//! Exercises a full build pass through the public API:
//!
//! - Entry-point discovery and partial exclusion
//! - Generator fan-out
//! - All-settled orchestration with failing jobs
//! - Verbose console reporting
//! - Asset overlay injection
//! - The fatal-failure channel

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use stylebuild::assets::AssetOverlay;
use stylebuild::build::{BuildContext, BuildPipeline, ConsoleReporter, JobStatus, NullReporter};
use stylebuild::compiler::{CompileFailure, Compiler, LightningCompiler, Rendered};
use stylebuild::config::{parse_config, ConfigError, Settings};
use stylebuild::options::CompileOptions;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a test file with content.
fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Settings with `styles/` as the only source root and `dist/` as output.
fn default_settings() -> Settings {
    parse_config("[project]\nout = \"dist\"").unwrap()
}

fn create_test_context(temp: &TempDir) -> BuildContext {
    BuildContext::new(&default_settings(), temp.path()).unwrap()
}

/// Compiler that copies the source text and fails on sources containing `@error`.
struct CopyCompiler {
    duration: Duration,
    seen: Mutex<Vec<CompileOptions>>,
}

impl CopyCompiler {
    fn new() -> Self {
        Self { duration: Duration::from_millis(2), seen: Mutex::new(Vec::new()) }
    }

    fn instant() -> Self {
        Self { duration: Duration::ZERO, ..Self::new() }
    }
}

impl Compiler for CopyCompiler {
    fn render(&self, options: &CompileOptions) -> Result<Rendered, CompileFailure> {
        self.seen.lock().unwrap().push(options.clone());
        let file = options.file.clone().unwrap_or_default();
        let css = match &options.data {
            Some(data) => data.clone(),
            None => fs::read_to_string(&file).map_err(|e| CompileFailure::io(&file, "read", &e))?,
        };
        if let Some(pos) = css.find("@error") {
            let line = css[..pos].lines().count().max(1);
            return Err(CompileFailure::with_location(&file, line, 1, "explicit @error"));
        }
        Ok(Rendered { css, duration: self.duration })
    }
}

/// Test writer for capturing output.
struct TestWriter(Arc<Mutex<Vec<u8>>>);

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn captured(output: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&output.lock().unwrap()).to_string()
}

// ============================================================================
// Discovery and Expansion
// ============================================================================

#[test]
fn test_partials_never_become_jobs() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/app.scss", "a {}");
    create_test_file(temp.path(), "styles/_base.scss", "");
    create_test_file(temp.path(), "styles/admin/_forms.scss", "");
    create_test_file(temp.path(), "styles/admin/panel.scss", "b {}");

    let pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()));
    let outputs: Vec<_> = pipeline.plan().unwrap().into_iter().map(|j| j.output_path).collect();

    assert_eq!(outputs, vec![PathBuf::from("admin/panel.css"), PathBuf::from("app.css")]);
}

#[test]
fn test_default_generator_output_path() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/app.scss", "a {}");

    let pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()));
    let jobs = pipeline.plan().unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].output_path, PathBuf::from("app.css"));
    assert_eq!(jobs[0].options.file, Some(temp.path().join("styles/app.scss")));
}

#[test]
fn test_source_roots_are_include_paths() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/app.scss", "a {}");

    let pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()));
    let jobs = pipeline.plan().unwrap();
    assert_eq!(jobs[0].options.include_paths, vec![temp.path().join("styles")]);
}

#[tokio::test]
async fn test_generator_fan_out() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/theme.scss", "ignored");

    let ctx = create_test_context(&temp).with_generator_fn(|_source, output, options, jobs| {
        for (suffix, color) in [("light", "white"), ("dark", "black"), ("print", "gray")] {
            let mut options = options.clone();
            options.data = Some(format!("body {{ color: {} }}", color));
            let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
            jobs.emit(output.with_file_name(format!("{}-{}.css", stem, suffix)), &options);
        }
    });

    let compiler = Arc::new(CopyCompiler::new());
    let mut pipeline = BuildPipeline::new(ctx, compiler.clone());
    let report = pipeline.build().await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert!(report.is_success());
    let dark = fs::read_to_string(temp.path().join("dist/theme-dark.css")).unwrap();
    assert_eq!(dark, "body { color: black }");

    let seen = compiler.seen.lock().unwrap();
    let mut data: Vec<_> = seen.iter().filter_map(|o| o.data.clone()).collect();
    data.sort();
    assert_eq!(data.len(), 3);
    assert!(data.iter().all(|d| d.starts_with("body")));
}

// ============================================================================
// Orchestration
// ============================================================================

#[tokio::test]
async fn test_failing_job_does_not_stop_siblings() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/a.scss", "a {}");
    create_test_file(temp.path(), "styles/b.scss", "b {}\n@error 'nope';");
    create_test_file(temp.path(), "styles/c.scss", "c {}");

    let mut pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()))
        .with_reporter(Arc::new(NullReporter));
    let report = pipeline.build().await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert!(report.outcomes[0].is_success());
    assert!(matches!(&report.outcomes[1].status, JobStatus::Failed(f) if f.line == 1));
    assert!(report.outcomes[2].is_success());
    assert!(temp.path().join("dist/a.css").is_file());
    assert!(!temp.path().join("dist/b.css").exists());
    assert!(temp.path().join("dist/c.css").is_file());
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn test_jobs_sharing_parent_directory() {
    let temp = TempDir::new().unwrap();
    for i in 0..16 {
        create_test_file(temp.path(), &format!("styles/deep/nested/s{}.scss", i), "a {}");
    }

    let mut pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()));
    let report = pipeline.build().await.unwrap();

    assert_eq!(report.success_count(), 16);
    assert_eq!(fs::read_dir(temp.path().join("dist/deep/nested")).unwrap().count(), 16);
}

#[tokio::test]
async fn test_fatal_channel_receives_every_failure() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/ok.scss", "a {}");
    create_test_file(temp.path(), "styles/bad1.scss", "@error 'x';");
    create_test_file(temp.path(), "styles/bad2.scss", "@error 'y';");

    let mut pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()));
    let mut failures = pipeline.subscribe_failures();
    let report = pipeline.build().await.unwrap();

    let mut files = Vec::new();
    while let Ok(failure) = failures.try_recv() {
        files.push(failure.file);
    }
    files.sort();

    assert_eq!(report.failed_count(), 2);
    assert_eq!(
        files,
        vec![temp.path().join("styles/bad1.scss"), temp.path().join("styles/bad2.scss")]
    );
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_out_file_in_base_options_fails_before_compiling() {
    let settings = parse_config("[project]\nout = \"dist\"\n\n[options]\nout_file = \"all.css\"");
    let settings = settings.unwrap();
    let result = BuildContext::new(&settings, "/project");
    assert!(matches!(result, Err(ConfigError::ForbiddenOption(key)) if key == "out_file"));
}

#[test]
fn test_camel_case_out_file_rejected() {
    let settings = parse_config("[project]\nout = \"dist\"\n\n[options]\noutFile = \"all.css\"");
    let result = BuildContext::new(&settings.unwrap(), "/project");
    assert!(matches!(result, Err(ConfigError::ForbiddenOption(key)) if key == "outFile"));
}

#[test]
fn test_missing_output_directory() {
    let settings = parse_config("[project]\nsources = [\"styles\"]").unwrap();
    let result = BuildContext::new(&settings, "/project");
    assert!(matches!(result, Err(ConfigError::MissingOutputDir)));
}

// ============================================================================
// Reporting
// ============================================================================

#[tokio::test]
async fn test_verbose_zero_duration_reports_one_millisecond() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/app.scss", "a {}");

    let output = Arc::new(Mutex::new(Vec::new()));
    let reporter = ConsoleReporter::with_output(TestWriter(Arc::clone(&output))).with_verbose(true);
    let mut pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::instant()))
        .with_reporter(Arc::new(reporter));
    pipeline.build().await.unwrap();

    let text = captured(&output);
    let source = temp.path().join("styles/app.scss");
    assert_eq!(text, format!("compile (0.001s) {} => app.css\n", source.display()));
}

#[tokio::test]
async fn test_verbose_failure_line() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/app.scss", "a {}\nb {}\n@error 'boom';");

    let output = Arc::new(Mutex::new(Vec::new()));
    let reporter = ConsoleReporter::with_output(TestWriter(Arc::clone(&output))).with_verbose(true);
    let mut pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()))
        .with_reporter(Arc::new(reporter));
    pipeline.build().await.unwrap();

    let text = captured(&output);
    assert!(text.starts_with("error "));
    assert!(text.contains("(Line 2, Column 1): explicit @error"));
    assert!(!text.contains(" of "));
}

#[tokio::test]
async fn test_quiet_build_prints_nothing() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/app.scss", "a {}");

    let output = Arc::new(Mutex::new(Vec::new()));
    let reporter = ConsoleReporter::with_output(TestWriter(Arc::clone(&output)));
    let mut pipeline = BuildPipeline::new(create_test_context(&temp), Arc::new(CopyCompiler::new()))
        .with_reporter(Arc::new(reporter));
    pipeline.build().await.unwrap();

    assert!(captured(&output).is_empty());
}

// ============================================================================
// Asset Overlay
// ============================================================================

#[tokio::test]
async fn test_overlay_injects_asset_options() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/admin/panel.scss", "a {}");
    create_test_file(temp.path(), "public/images/logo.png", "png");

    let settings = parse_config(
        r#"
[project]
out = "dist"

[assets]
dirs = "public/images"
http_prefix = "/assets"
relative = true
"#,
    )
    .unwrap();
    let ctx = BuildContext::new(&settings, temp.path()).unwrap();

    let compiler = Arc::new(CopyCompiler::new());
    let mut pipeline = BuildPipeline::new(ctx, compiler.clone());
    assert!(pipeline.overlay().is_configured());
    pipeline.build().await.unwrap();

    let seen = compiler.seen.lock().unwrap();
    let assets = seen[0].assets.as_ref().unwrap();
    let urls = assets.urls.as_ref().unwrap();
    assert_eq!(urls.http_prefix.as_deref(), Some("/assets"));
    assert_eq!(urls.relative_to.as_deref(), Some("/admin"));
    assert_eq!(assets.build_dir.as_deref(), Some(temp.path().join("dist").as_path()));
    assert_eq!(assets.sources.len(), 1);
    assert_eq!(assets.sources[0].directory, temp.path().join("public/images"));
    assert_eq!(seen[0].out_file, Some(temp.path().join("dist/admin/panel.css")));
}

#[tokio::test]
async fn test_configure_hook_sees_job() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/app.scss", "a {}");

    let overlay = AssetOverlay::new().with_configure(|catalog, _compiler, details| {
        let name = details.output_path.to_string_lossy().to_string();
        catalog.options_mut().extra.insert("job".to_string(), name.into());
        Ok(())
    });

    let compiler = Arc::new(CopyCompiler::new());
    let mut pipeline =
        BuildPipeline::new(create_test_context(&temp), compiler.clone()).with_overlay(overlay);
    pipeline.build().await.unwrap();

    let seen = compiler.seen.lock().unwrap();
    assert_eq!(seen[0].extra("job"), Some(&serde_json::json!("app.css")));
}

// ============================================================================
// Bundled Compiler
// ============================================================================

#[tokio::test]
async fn test_lightningcss_end_to_end() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "styles/site.css", ".a { color: #ff0000; }");
    create_test_file(temp.path(), "styles/broken.css", ".a {}\n.b { color: red }\n}}}\n.c[ { }");

    let settings = parse_config(
        r#"
[project]
out = "dist"
extension = "css"

[options]
output_style = "compressed"
"#,
    )
    .unwrap();
    let ctx = BuildContext::new(&settings, temp.path()).unwrap();

    let mut pipeline = BuildPipeline::new(ctx, Arc::new(LightningCompiler::new()));
    let report = pipeline.build().await.unwrap();

    let site = fs::read_to_string(temp.path().join("dist/site.css")).unwrap();
    assert!(site.contains("color:red"));

    assert_eq!(report.success_count(), 1);
    let broken = report
        .outcomes
        .iter()
        .find(|o| o.output_path == Path::new("broken.css"))
        .expect("broken.css should have an outcome");
    match &broken.status {
        JobStatus::Failed(failure) => {
            assert_eq!(failure.line, 4);
            assert_eq!(failure.column, 8);
            assert!(failure.file.ends_with("styles/broken.css"));
        }
        other => panic!("expected a failure, got {}", other),
    }
    assert!(!temp.path().join("dist/broken.css").exists());
}
