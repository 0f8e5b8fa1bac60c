//! Configuration schema types for `siteforge.toml`
//!
//! Defines the structure and defaults for project configuration. All fields
//! are optional in the file; the defaults reproduce the conventional
//! `templates/` + `static/` + `build/` layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Project metadata and directory layout
    #[serde(default)]
    pub project: ProjectConfig,
    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory containing page templates
    #[serde(default = "default_templates")]
    pub templates: PathBuf,
    /// Directory containing static assets (scss, js, img, fonts, data)
    #[serde(default = "default_assets")]
    pub assets: PathBuf,
    /// Build output directory
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            templates: default_templates(),
            assets: default_assets(),
            out: default_out(),
        }
    }
}

fn default_name() -> String {
    "site".to_string()
}

fn default_templates() -> PathBuf {
    PathBuf::from("templates")
}

fn default_assets() -> PathBuf {
    PathBuf::from("static")
}

fn default_out() -> PathBuf {
    PathBuf::from("build")
}

/// Dev server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP port to bind on localhost
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path served when a client requests the root
    #[serde(default = "default_start_path")]
    pub start_path: String,
    /// Inject the live-reload client into served HTML
    #[serde(default = "default_notify")]
    pub notify: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port(), start_path: default_start_path(), notify: default_notify() }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_start_path() -> String {
    "index.html".to_string()
}

fn default_notify() -> bool {
    true
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for file-system events, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Clear the terminal before each rebuild
    #[serde(default)]
    pub clear_screen: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

fn default_debounce_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_layout() {
        let config = SiteConfig::default();
        assert_eq!(config.project.templates, PathBuf::from("templates"));
        assert_eq!(config.project.assets, PathBuf::from("static"));
        assert_eq!(config.project.out, PathBuf::from("build"));
    }

    #[test]
    fn test_default_server() {
        let config = SiteConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.start_path, "index.html");
        assert!(config.server.notify);
    }

    #[test]
    fn test_parse_minimal() {
        let config: SiteConfig = toml::from_str("").unwrap();
        assert_eq!(config.project.name, "site");
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_parse_overrides() {
        let config: SiteConfig = toml::from_str(
            r#"
            [project]
            name = "portfolio"
            out = "dist"

            [server]
            port = 8080
            notify = false

            [watch]
            debounce_ms = 250
            clear_screen = true
            "#,
        )
        .unwrap();

        assert_eq!(config.project.name, "portfolio");
        assert_eq!(config.project.out, PathBuf::from("dist"));
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.notify);
        assert_eq!(config.watch.debounce_ms, 250);
        assert!(config.watch.clear_screen);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[pipeline]\nenabled = true\n");
        assert!(result.is_err());
    }
}
