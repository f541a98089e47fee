//! Configuration module for the stylebuild build step
//!
//! Provides types and parsing for `stylebuild.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{
    default_settings, find_config, find_config_from, load_config, merge_cli_overrides,
    parse_config, CliOverrides, ConfigError, CONFIG_FILE,
};
pub use schema::*;
