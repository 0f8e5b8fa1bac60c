//! Serve command implementation
//!
//! `siteforge serve` (and bare `siteforge`) runs the full dev loop: clean,
//! build everything, then serve the output tree while watching sources and
//! rebuilding on change. The watcher runs on a blocking thread; the server
//! and Ctrl+C handling live on the tokio runtime.

use std::path::Path;
use std::process::ExitCode;

use super::{build, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{clean_output, run_all};
use crate::config::CliOverrides;
use crate::reload::Reloader;
use crate::server::{self, ServerOptions};
use crate::watch;

/// Run the serve command
pub fn run_serve(port: Option<u16>, out: Option<&Path>) -> ExitCode {
    let overrides = CliOverrides { out: out.map(|p| p.to_path_buf()), port };
    let (config, root) = match build::load_project(&overrides) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let registry = match build::build_registry(&config, &root) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Invalid project layout: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // A stale output tree must not be served; failing to clean is fatal.
    if let Err(e) = clean_output(registry.out_root()) {
        eprintln!("Clean failed: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    let reloader = Reloader::new();
    let report = run_all(&registry, &reloader, false);
    println!("{}", report.summary());
    if !report.is_success() {
        // Serve anyway: watch mode lets the user fix sources and see the
        // rebuild land without restarting.
        eprintln!("Continuing with errors; fix sources to trigger a rebuild");
    }

    let options = ServerOptions {
        root: registry.out_root().to_path_buf(),
        port: config.server.port,
        start_path: config.server.start_path.clone(),
        notify: config.server.notify,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let watch_config = config.watch.clone();
    let watch_registry = registry.clone();
    let watch_reloader = reloader.clone();

    let result: Result<(), String> = runtime.block_on(async {
        let server_task = tokio::spawn(server::serve(options, reloader.clone()));
        let watch_task = tokio::task::spawn_blocking(move || {
            watch::watch_and_rebuild(&watch_registry, &watch_config, &watch_reloader)
        });

        tokio::select! {
            joined = server_task => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("server task panicked: {}", e)),
            },
            joined = watch_task => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("watch task panicked: {}", e)),
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Shutting down");
                Ok(())
            }
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
