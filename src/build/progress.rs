//! Job result reporting.
//!
//! A [`Reporter`] sees every settled job once. The console reporter prints
//! one line per job when verbose and stays silent otherwise.

use owo_colors::OwoColorize;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::build::result::{JobOutcome, JobStatus};
use crate::compiler::CompileFailure;

/// Trait for job reporters.
pub trait Reporter: Send + Sync {
    /// Report a settled job.
    fn report(&self, outcome: &JobOutcome);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }
}

/// A reporter that discards all outcomes.
#[derive(Debug, Default)]
pub struct NullReporter;

impl NullReporter {
    /// Create a new null reporter.
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for NullReporter {
    fn report(&self, _outcome: &JobOutcome) {}
}

/// Console reporter with optional colors.
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to print job lines
    verbose: bool,
    /// Output writer (for testing)
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl ConsoleReporter {
    /// Create a console reporter writing to stdout.
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
            verbose: false,
            output: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Create a console reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false, // Disable colors for custom output
            verbose: false,
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn success_line(&self, outcome: &JobOutcome, duration: Duration) -> String {
        let action = format!("compile ({}s)", format_seconds(duration));
        let action =
            if self.use_colors { action.green().reversed().to_string() } else { action };
        format!("{} {} => {}", action, outcome.source.display(), outcome.output_path.display())
    }

    fn failure_line(&self, outcome: &JobOutcome, failure: &CompileFailure) -> String {
        let location = failure_location(&outcome.source, failure);
        if self.use_colors {
            format!(
                "{} {} ({}): {}",
                "error".white().on_red(),
                outcome.source.display(),
                location,
                failure.message.red()
            )
        } else {
            format!("error {} ({}): {}", outcome.source.display(), location, failure.message)
        }
    }

    /// Write a line to output.
    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, outcome: &JobOutcome) {
        if !self.verbose {
            return;
        }

        let line = match &outcome.status {
            JobStatus::Compiled { duration, .. } => self.success_line(outcome, *duration),
            JobStatus::Failed(failure) => self.failure_line(outcome, failure),
        };
        self.writeln(&line);
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Format a compile duration in seconds. Nothing takes zero seconds, so a
/// zero duration renders as `0.001`.
pub fn format_seconds(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis == 0 {
        "0.001".to_string()
    } else {
        format!("{}", millis as f64 / 1000.0)
    }
}

/// `Line n, Column n`, plus ` of <file>` when the failure was reported in a
/// file other than the entry point (usually an imported partial).
pub fn failure_location(source: &Path, failure: &CompileFailure) -> String {
    let mut location = format!("Line {}, Column {}", failure.line, failure.column);
    let reported = failure.file.to_string_lossy();
    if !reported.ends_with(source.to_string_lossy().as_ref()) {
        location.push_str(&format!(" of {}", reported));
    }
    location
}
