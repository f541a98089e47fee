//! Build pipeline module for stylebuild
//!
//! Compiles every stylesheet entry point under the configured source roots
//! into the output directory.
//!
//! # Overview
//!
//! A build pass consists of:
//! - **Discovery**: find non-partial entry points under each source root
//! - **Expansion**: a generator turns each entry point into compile jobs
//! - **Orchestration**: options hooks run, then every job compiles concurrently
//! - **Reporting**: each settled job is reported; failures are also signaled
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stylebuild::build::{BuildContext, BuildPipeline};
//! use stylebuild::compiler::LightningCompiler;
//! use stylebuild::config::load_config;
//!
//! let settings = load_config(None)?;
//! let context = BuildContext::new(&settings, project_root)?;
//! let mut pipeline = BuildPipeline::new(context, Arc::new(LightningCompiler::new()));
//!
//! let report = pipeline.build().await?;
//! println!("{}", report.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod hook;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod signal;
pub mod trigger;

pub use context::*;
pub use discovery::*;
pub use hook::*;
pub use job::*;
pub use orchestrator::*;
pub use pipeline::*;
pub use progress::*;
pub use result::*;
pub use signal::*;
pub use trigger::*;
