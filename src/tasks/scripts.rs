//! JavaScript bundling task.
//!
//! Scripts use a textual include mechanism, not a module system: lines of
//! the form `//= include rel/path.js` (or `//= require`) are replaced by the
//! referenced file's content before minification. Resolution walks the
//! include graph depth-first with an explicit visiting stack, so a circular
//! include is detected and fails that entry instead of recursing forever.
//!
//! Per stale entry: expand includes, write the expanded bundle, minify it,
//! write the `.min` bundle and its source map. The staleness base is the
//! newest mtime over the entry and every file it transitively includes.

use super::{discover, source_map_stub, write_output, TaskError};
use crate::build::{stale, FileResult, TaskReport};
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use minify_js::{minify, Session, TopLevelMode};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub fn run(registry: &PathRegistry, reloader: &Reloader, force: bool) -> TaskReport {
    let start = Instant::now();
    let entry = registry.resolve(AssetKind::Scripts);
    let mut report = TaskReport::new(AssetKind::Scripts);

    let sources = match discover(&entry.source_glob) {
        Ok(sources) => sources,
        Err(e) => return TaskReport::task_failed(AssetKind::Scripts, e.to_string()),
    };

    for source in sources {
        let stem = match source.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let bundle_path = entry.out_dir.join(format!("{}.js", stem));
        let min_path = entry.out_dir.join(format!("{}.min.js", stem));
        let map_path = entry.out_dir.join(format!("{}.min.js.map", stem));

        let (expanded, involved) = match resolve_includes(&source) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(script = %source.display(), "{}", e);
                report.push(FileResult::failed(source, e.to_string()));
                continue;
            }
        };

        let outputs = [bundle_path.as_path(), min_path.as_path(), map_path.as_path()];
        if !force && !stale::any_stale(outputs, stale::newest_mtime(&involved)) {
            report.push(FileResult::skipped(source));
            continue;
        }

        match emit_bundle(&expanded, &bundle_path, &min_path, &map_path) {
            Ok(()) => report.push(FileResult::built(source, vec![bundle_path, min_path, map_path])),
            Err(e) => {
                tracing::warn!(script = %source.display(), "{}", e);
                report.push(FileResult::failed(source, e.to_string()));
            }
        }
    }

    if report.changed() {
        reloader.broadcast(AssetKind::Scripts);
    }
    report.duration = start.elapsed();
    report
}

/// Expand `//= include` directives into a single flattened unit.
///
/// Returns the expanded source and every file that participated, for
/// staleness tracking.
pub(crate) fn resolve_includes(entry: &Path) -> Result<(String, Vec<PathBuf>), TaskError> {
    let mut visiting = Vec::new();
    let mut involved = Vec::new();
    let expanded = expand_file(entry, &mut visiting, &mut involved)?;
    Ok((expanded, involved))
}

fn expand_file(
    path: &Path,
    visiting: &mut Vec<PathBuf>,
    involved: &mut Vec<PathBuf>,
) -> Result<String, TaskError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if visiting.contains(&canonical) {
        let mut chain: Vec<String> =
            visiting.iter().map(|p| p.display().to_string()).collect();
        chain.push(canonical.display().to_string());
        return Err(TaskError::CircularInclude(chain.join(" -> ")));
    }
    visiting.push(canonical.clone());
    involved.push(canonical.clone());

    let source = std::fs::read_to_string(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let directive = regex::Regex::new(r"^\s*//=\s*(?:include|require)\s+(\S+)\s*$")
        .expect("static regex");

    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        match directive.captures(line) {
            Some(captures) => {
                let target = dir.join(&captures[1]);
                if !target.is_file() {
                    return Err(TaskError::IncludeMissing {
                        include: target,
                        from: path.to_path_buf(),
                    });
                }
                out.push_str(&expand_file(&target, visiting, involved)?);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    visiting.pop();
    Ok(out)
}

fn emit_bundle(
    expanded: &str,
    bundle_path: &Path,
    min_path: &Path,
    map_path: &Path,
) -> Result<(), TaskError> {
    write_output(bundle_path, expanded.as_bytes())?;

    let session = Session::new();
    let mut minified = Vec::new();
    minify(&session, TopLevelMode::Global, expanded.as_bytes(), &mut minified)
        .map_err(|e| TaskError::Minify(format!("{:?}", e)))?;

    let map_name = map_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    minified.extend_from_slice(format!("\n//# sourceMappingURL={}\n", map_name).as_bytes());
    write_output(min_path, &minified)?;

    let min_name = min_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let bundle_name = bundle_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    write_output(map_path, source_map_stub(&min_name, &bundle_name).as_bytes())?;
    Ok(())
}
