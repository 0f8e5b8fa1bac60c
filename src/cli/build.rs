//! Build and clean command implementations

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{clean_output, run_all};
use crate::config::{
    find_config, load_config, merge_cli_overrides, CliOverrides, ConfigError, SiteConfig,
};
use crate::paths::PathRegistry;
use crate::reload::Reloader;

/// Load configuration and determine the project root: the directory holding
/// `siteforge.toml`, or the current directory when there is none.
pub(super) fn load_project(overrides: &CliOverrides) -> Result<(SiteConfig, PathBuf), ConfigError> {
    let (mut config, root) = match find_config() {
        Some(config_path) => {
            tracing::debug!("using config {}", config_path.display());
            let config = load_config(Some(&config_path))?;
            let root = config_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
            (config, root)
        }
        None => {
            tracing::debug!("no siteforge.toml found, using defaults");
            (load_config(None)?, std::env::current_dir().unwrap_or_default())
        }
    };
    merge_cli_overrides(&mut config, overrides);
    Ok((config, root))
}

/// Build a verified path registry for the loaded project.
pub(super) fn build_registry(config: &SiteConfig, root: &Path) -> Result<PathRegistry, String> {
    let registry = PathRegistry::from_config(config, root);
    registry.verify_disjoint_outputs()?;
    Ok(registry)
}

/// Run the build command
pub fn run_build(clean: bool, force: bool, out: Option<&Path>) -> ExitCode {
    let overrides = CliOverrides { out: out.map(|p| p.to_path_buf()), ..Default::default() };
    let (config, root) = match load_project(&overrides) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let registry = match build_registry(&config, &root) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Invalid project layout: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if clean {
        if let Err(e) = clean_output(registry.out_root()) {
            eprintln!("Clean failed: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let report = run_all(&registry, &Reloader::new(), force);
    if report.is_success() {
        println!("{}", report.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", report.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the clean command
pub fn run_clean() -> ExitCode {
    let (config, root) = match load_project(&CliOverrides::default()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let out_root = PathRegistry::from_config(&config, &root).out_root().to_path_buf();
    match clean_output(&out_root) {
        Ok(()) => {
            println!("Removed {}", out_root.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Clean failed: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
