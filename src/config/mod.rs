//! Configuration module for the siteforge pipeline
//!
//! Provides types and parsing for `siteforge.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{
    default_config, find_config, load_config, merge_cli_overrides, CliOverrides, ConfigError,
};
pub use schema::*;
