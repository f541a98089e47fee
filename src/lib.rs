//! stylebuild - Stylesheet build step
//!
//! This library provides functionality to:
//! - Discover stylesheet entry points under one or more source roots
//! - Expand each entry point into one or more compile jobs
//! - Compile all jobs concurrently, collecting every outcome
//! - Inject asset pipeline metadata into each job's compiler options

pub mod assets;
pub mod build;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod options;
