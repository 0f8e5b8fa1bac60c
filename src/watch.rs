//! Watch mode for automatic rebuilds on file changes
//!
//! One debounced watcher covers the template and asset trees. Each batch of
//! events is classified against the per-kind watch globs, and every affected
//! task runs once for that batch regardless of how many files changed. Tasks
//! run sequentially in the watch thread, so overlapping bursts coalesce into
//! consecutive single runs instead of racing each other.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;

use crate::config::WatchConfig;
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use crate::tasks;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Channel receive error
    #[error("watch channel error: {0}")]
    Channel(String),
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Asset kinds whose watch glob matches the given path, in task order.
fn classify(registry: &PathRegistry, path: &std::path::Path) -> Vec<AssetKind> {
    AssetKind::WATCHED
        .iter()
        .copied()
        .filter(|kind| {
            let entry = registry.resolve(*kind);
            match glob::Pattern::new(&entry.watch_glob) {
                Ok(pattern) => pattern.matches_path(path),
                Err(_) => false,
            }
        })
        .collect()
}

/// Watch for file changes and rebuild affected asset kinds.
///
/// Blocks the calling thread until the watcher channel closes.
pub fn watch_and_rebuild(
    registry: &PathRegistry,
    config: &WatchConfig,
    reloader: &Reloader,
) -> Result<(), WatchError> {
    let (tx, rx) = channel();

    let debounce_duration = Duration::from_millis(config.debounce_ms);
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;

    for root in registry.watch_roots() {
        if !root.exists() {
            tracing::debug!("skipping missing watch root {}", root.display());
            continue;
        }
        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(WatchError::WatchPath)?;
        println!("[{}] Watching {} for changes...", timestamp(), root.display());
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                // One pass per affected kind, however many files changed.
                let mut affected: Vec<AssetKind> = Vec::new();
                for event in
                    events.iter().filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                {
                    for kind in classify(registry, &event.path) {
                        if !affected.contains(&kind) {
                            affected.push(kind);
                        }
                    }
                }

                if affected.is_empty() {
                    continue;
                }

                for event in &events {
                    if let Some(name) = event.path.file_name() {
                        println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                    }
                }

                if config.clear_screen {
                    clear_screen();
                }

                for kind in affected {
                    let report = tasks::run(kind, registry, reloader, false);
                    if report.is_success() {
                        println!(
                            "[{}] {} rebuilt ({}) - {}",
                            timestamp(),
                            kind,
                            format_duration(report.duration),
                            report.summary()
                        );
                    } else {
                        println!(
                            "[{}] {} failed ({}) - {}",
                            timestamp(),
                            kind,
                            format_duration(report.duration),
                            report.summary()
                        );
                        for failure in report.failures() {
                            eprintln!(
                                "[{}] Error: {}: {}",
                                timestamp(),
                                failure.source.display(),
                                failure.status
                            );
                        }
                    }
                }
            }
            Ok(Err(error)) => {
                // Watch error (non-fatal) - log but continue watching
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => {
                return Err(WatchError::Channel(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_timestamp_shape() {
        let stamp = timestamp();
        assert_eq!(stamp.len(), 8);
        assert_eq!(stamp.matches(':').count(), 2);
    }

    #[test]
    fn test_classify_scss() {
        let temp = TempDir::new().unwrap();
        let registry = PathRegistry::from_config(&default_config(), temp.path());

        let kinds = classify(&registry, &temp.path().join("static/scss/parts/_nav.scss"));
        assert_eq!(kinds, vec![AssetKind::Styles]);
    }

    #[test]
    fn test_classify_template_and_data() {
        let temp = TempDir::new().unwrap();
        let registry = PathRegistry::from_config(&default_config(), temp.path());

        let kinds = classify(&registry, &temp.path().join("templates/index.njk"));
        assert!(kinds.contains(&AssetKind::Templates));

        let kinds = classify(&registry, &temp.path().join("static/data/index.njk.json"));
        assert!(kinds.contains(&AssetKind::Data));
    }

    #[test]
    fn test_classify_unrelated_file() {
        let temp = TempDir::new().unwrap();
        let registry = PathRegistry::from_config(&default_config(), temp.path());

        assert!(classify(&registry, Path::new("/elsewhere/readme.md")).is_empty());
        assert!(classify(&registry, &temp.path().join("build/css/main.css")).is_empty());
    }
}
