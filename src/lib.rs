//! Siteforge - static-site asset build pipeline
//!
//! This library provides functionality to:
//! - Render Jinja-style templates against per-page JSON data files
//! - Compile SCSS into prefixed, media-query-grouped, minified CSS
//! - Expand textual `//= include` directives and minify JavaScript
//! - Transcode images to WebP and write format-preserving optimized copies
//! - Serve the output directory with live reload while watching for changes

pub mod build;
pub mod cli;
pub mod config;
pub mod paths;
pub mod reload;
pub mod server;
pub mod tasks;
pub mod watch;
