//! Template rendering task.
//!
//! Renders each `.njk` template against its associated data record, a JSON
//! document bound by filename convention: `page.njk` reads
//! `<data dir>/page.njk.json`. The rendered document lands in the output
//! root with the relative path preserved and the extension rewritten to
//! `.html`.
//!
//! The staleness base is the newer of the template and its data file, so a
//! data-only edit re-renders the page. A missing or malformed data record
//! fails only that template; siblings in the same pass still render.

use super::{discover, relative_output, write_output, TaskError};
use crate::build::{stale, FileResult, TaskReport};
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub fn run(registry: &PathRegistry, reloader: &Reloader, force: bool) -> TaskReport {
    let start = Instant::now();
    let entry = registry.resolve(AssetKind::Templates);
    let mut report = TaskReport::new(AssetKind::Templates);

    let sources = match discover(&entry.source_glob) {
        Ok(sources) => sources,
        Err(e) => return TaskReport::task_failed(AssetKind::Templates, e.to_string()),
    };

    for source in sources {
        let out_path =
            relative_output(&source, &entry.base_dir, &entry.out_dir).with_extension("html");
        let data_path = data_record_path(registry.data_dir(), &source);

        let newest = stale::newest_mtime([&source, &data_path]);
        if !force && !stale::is_stale(&out_path, newest) {
            report.push(FileResult::skipped(source));
            continue;
        }

        match render_one(&source, &data_path, &out_path) {
            Ok(()) => report.push(FileResult::built(source, vec![out_path])),
            Err(e) => {
                tracing::warn!(template = %source.display(), "{}", e);
                report.push(FileResult::failed(source, e.to_string()));
            }
        }
    }

    if report.changed() {
        reloader.broadcast(AssetKind::Templates);
    }
    report.duration = start.elapsed();
    report
}

/// Data record path for a template: `<data dir>/<template file name>.json`.
fn data_record_path(data_dir: &Path, template: &Path) -> PathBuf {
    let name = template.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    data_dir.join(format!("{}.json", name))
}

fn render_one(source: &Path, data_path: &Path, out_path: &Path) -> Result<(), TaskError> {
    let template_src = std::fs::read_to_string(source)?;

    let data_raw = std::fs::read_to_string(data_path)
        .map_err(|_| TaskError::DataMissing(data_path.to_path_buf()))?;
    let data: serde_json::Value = serde_json::from_str(&data_raw)
        .map_err(|e| TaskError::DataMalformed { path: data_path.to_path_buf(), source: e })?;

    let env = minijinja::Environment::new();
    let template = env.template_from_str(&template_src)?;
    let rendered = template.render(&data)?;

    write_output(out_path, rendered.as_bytes())
}
