//! Siteforge - command-line static-site asset pipeline

use std::process::ExitCode;

use siteforge::cli;

fn main() -> ExitCode {
    cli::run()
}
