//! Configuration loading and discovery for `siteforge.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SiteConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse siteforge.toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override dev server port
    pub port: Option<u16>,
}

/// Find siteforge.toml by walking up from the current working directory.
///
/// # Returns
/// - `Some(path)` if a siteforge.toml file is found
/// - `None` if no config file is found
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find siteforge.toml by walking up from a specific directory.
///
/// Internal implementation that allows specifying the start directory,
/// useful for testing.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join("siteforge.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a path, or return defaults when `None`.
pub fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            let config = toml::from_str(&content)?;
            Ok(config)
        }
        None => Ok(default_config()),
    }
}

/// The built-in default configuration.
pub fn default_config() -> SiteConfig {
    SiteConfig::default()
}

/// Apply CLI overrides on top of a loaded config.
pub fn merge_cli_overrides(config: &mut SiteConfig, overrides: &CliOverrides) {
    if let Some(out) = &overrides.out {
        config.project.out = out.clone();
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
}
