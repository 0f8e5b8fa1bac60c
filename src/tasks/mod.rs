//! Transform tasks, one per asset category.
//!
//! Each task globs its sources, skips files whose outputs are up to date,
//! applies a fixed transform chain, writes into its category's output
//! directory, and broadcasts a reload when anything was rewritten. A failing
//! file is reported in the task report and never aborts the rest of the
//! batch.

pub mod fonts;
pub mod images;
pub mod scripts;
pub mod styles;
pub mod templates;

use crate::build::TaskReport;
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error inside a single file's transform chain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// File I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Invalid glob pattern in the path registry
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// Associated data record missing for a template
    #[error("data record not found: {}", .0.display())]
    DataMissing(PathBuf),
    /// Associated data record is not valid JSON
    #[error("malformed data record {}: {source}", path.display())]
    DataMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Template rendering failed
    #[error("render failed: {0}")]
    Render(#[from] minijinja::Error),
    /// SCSS compilation failed
    #[error("scss compile failed: {0}")]
    Sass(String),
    /// CSS transform or minification failed
    #[error("css transform failed: {0}")]
    Css(String),
    /// JavaScript minification failed
    #[error("js minify failed: {0}")]
    Minify(String),
    /// Circular `//= include` chain
    #[error("circular include: {0}")]
    CircularInclude(String),
    /// Included file could not be found
    #[error("include not found: {} (from {})", include.display(), from.display())]
    IncludeMissing { include: PathBuf, from: PathBuf },
    /// Image decode or encode failed
    #[error("image processing failed: {0}")]
    Image(String),
}

/// Run the task for a category. `Data` dispatches to the template task: a
/// data change means its template must re-render, and the template task's
/// staleness base already includes the data file's mtime.
pub fn run(kind: AssetKind, registry: &PathRegistry, reloader: &Reloader, force: bool) -> TaskReport {
    match kind {
        AssetKind::Templates | AssetKind::Data => templates::run(registry, reloader, force),
        AssetKind::Styles => styles::run(registry, reloader, force),
        AssetKind::Scripts => scripts::run(registry, reloader, force),
        AssetKind::Images => images::run(registry, reloader, force),
        AssetKind::Fonts => fonts::run(registry, reloader, force),
    }
}

/// Discover source files matching a glob pattern, sorted for deterministic
/// batch order.
pub(crate) fn discover(pattern: &str) -> Result<Vec<PathBuf>, TaskError> {
    let paths = glob::glob(pattern)
        .map_err(|e| TaskError::Pattern { pattern: pattern.to_string(), source: e })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("error reading path during discovery: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Output path preserving the source's structure relative to its base
/// directory. Falls back to the bare file name for sources outside the base.
pub(crate) fn relative_output(source: &Path, base_dir: &Path, out_dir: &Path) -> PathBuf {
    match source.strip_prefix(base_dir) {
        Ok(rel) => out_dir.join(rel),
        Err(_) => out_dir.join(source.file_name().unwrap_or_default()),
    }
}

/// Write output bytes, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, content: &[u8]) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Minimal `version: 3` source map referencing the expanded artifact. The
/// minifiers in the chain do not emit mappings, so the map records the
/// source relationship without position data.
pub(crate) fn source_map_stub(file: &str, source: &str) -> String {
    serde_json::json!({
        "version": 3,
        "file": file,
        "sources": [source],
        "names": [],
        "mappings": "",
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_sorted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.njk"), "").unwrap();
        fs::write(temp.path().join("a.njk"), "").unwrap();

        let files = discover(&format!("{}/*.njk", temp.path().display())).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.njk"));
    }

    #[test]
    fn test_discover_skips_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub.njk")).unwrap();

        let files = discover(&format!("{}/*.njk", temp.path().display())).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_relative_output_preserves_structure() {
        let out = relative_output(
            Path::new("/proj/static/img/icons/x.png"),
            Path::new("/proj/static/img"),
            Path::new("/proj/build/img"),
        );
        assert_eq!(out, PathBuf::from("/proj/build/img/icons/x.png"));
    }

    #[test]
    fn test_relative_output_foreign_source() {
        let out = relative_output(
            Path::new("/elsewhere/x.png"),
            Path::new("/proj/static/img"),
            Path::new("/proj/build/img"),
        );
        assert_eq!(out, PathBuf::from("/proj/build/img/x.png"));
    }

    #[test]
    fn test_source_map_stub_shape() {
        let map = source_map_stub("app.min.js", "app.js");
        let parsed: serde_json::Value = serde_json::from_str(&map).unwrap();
        assert_eq!(parsed["version"], 3);
        assert_eq!(parsed["sources"][0], "app.js");
    }
}
