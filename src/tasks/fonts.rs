//! Font copy task.
//!
//! Fonts need no transformation; stale files are copied into `build/fonts/`
//! with their relative structure preserved.

use super::{discover, relative_output};
use crate::build::{stale, FileResult, TaskReport};
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use std::time::Instant;

pub fn run(registry: &PathRegistry, reloader: &Reloader, force: bool) -> TaskReport {
    let start = Instant::now();
    let entry = registry.resolve(AssetKind::Fonts);
    let mut report = TaskReport::new(AssetKind::Fonts);

    let sources = match discover(&entry.source_glob) {
        Ok(sources) => sources,
        Err(e) => return TaskReport::task_failed(AssetKind::Fonts, e.to_string()),
    };

    for source in sources {
        let out_path = relative_output(&source, &entry.base_dir, &entry.out_dir);
        if !force && !stale::source_newer(&source, &out_path) {
            report.push(FileResult::skipped(source));
            continue;
        }

        let copy = || -> std::io::Result<()> {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&source, &out_path)?;
            Ok(())
        };
        match copy() {
            Ok(()) => report.push(FileResult::built(source, vec![out_path])),
            Err(e) => {
                tracing::warn!(font = %source.display(), "{}", e);
                report.push(FileResult::failed(source, e.to_string()));
            }
        }
    }

    if report.changed() {
        reloader.broadcast(AssetKind::Fonts);
    }
    report.duration = start.elapsed();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fonts_copied() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("static/fonts/body")).unwrap();
        fs::write(temp.path().join("static/fonts/body/sans.woff2"), b"\x00font").unwrap();
        let registry = PathRegistry::from_config(&default_config(), temp.path());

        let report = run(&registry, &Reloader::new(), false);
        assert!(report.is_success(), "{}", report.summary());
        assert!(temp.path().join("build/fonts/body/sans.woff2").exists());

        let second = run(&registry, &Reloader::new(), false);
        assert_eq!(second.skipped_count(), 1);
    }
}
