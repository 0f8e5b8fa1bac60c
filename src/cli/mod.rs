//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations. Running with no subcommand starts
//! the dev server, which is the everyday loop for this tool.

mod build;
mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Siteforge - compile templates, styles, scripts, and images into a static site
#[derive(Parser)]
#[command(name = "siteforge")]
#[command(about = "Siteforge - static site asset pipeline with dev server and live reload")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build all assets into the output directory
    Build {
        /// Delete the output directory before building
        #[arg(long)]
        clean: bool,

        /// Force rebuild all files (ignore staleness checks)
        #[arg(short, long)]
        force: bool,

        /// Override output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete the output directory
    Clean,

    /// Build, then serve the output directory with live reload and rebuild
    /// on change
    Serve {
        /// Override dev server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the defaults.
fn init_logging(verbose: bool) {
    let default_filter =
        if verbose { "siteforge=debug,tower_http=debug" } else { "siteforge=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init().ok();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { port: None, out: None, verbose: false }) {
        Commands::Build { clean, force, out, verbose } => {
            init_logging(verbose);
            build::run_build(clean, force, out.as_deref())
        }
        Commands::Clean => {
            init_logging(false);
            build::run_clean()
        }
        Commands::Serve { port, out, verbose } => {
            init_logging(verbose);
            serve::run_serve(port, out.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_is_valid() {
        let cli = Cli::try_parse_from(["siteforge"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_build_flags() {
        let cli = Cli::try_parse_from(["siteforge", "build", "--clean", "--force"]).unwrap();
        match cli.command {
            Some(Commands::Build { clean, force, out, .. }) => {
                assert!(clean);
                assert!(force);
                assert!(out.is_none());
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::try_parse_from(["siteforge", "serve", "--port", "8080"]).unwrap();
        match cli.command {
            Some(Commands::Serve { port, .. }) => assert_eq!(port, Some(8080)),
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["siteforge", "deploy"]).is_err());
    }
}
