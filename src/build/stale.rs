//! Staleness checks used by every transform task.
//!
//! One conservative predicate: a source needs reprocessing iff its output is
//! missing or the newest relevant source modification time is strictly newer
//! than the output's. Tasks that depend on more than one input (a template
//! plus its data file, a script plus its includes) feed the newest of those
//! times in.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Modification time of a path, if it exists and the filesystem reports one.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Newest modification time across a set of paths. `None` when no path
/// yields a timestamp.
pub fn newest_mtime<I>(paths: I) -> Option<SystemTime>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    paths.into_iter().filter_map(|p| mtime(p.as_ref())).max()
}

/// Whether an output needs to be (re)built given the newest source time.
///
/// A missing output is always stale. A source with no readable mtime is
/// treated as changed.
pub fn is_stale(output: &Path, newest_source: Option<SystemTime>) -> bool {
    match (mtime(output), newest_source) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(out), Some(src)) => src > out,
    }
}

/// Convenience check for single-input tasks.
pub fn source_newer(source: &Path, output: &Path) -> bool {
    is_stale(output, mtime(source))
}

/// Whether any of a fan-out of outputs needs rebuilding. A transform that
/// writes several artifacts per source must rebuild when even one of them is
/// missing or older than the newest input.
pub fn any_stale<'a, I>(outputs: I, newest_source: Option<SystemTime>) -> bool
where
    I: IntoIterator<Item = &'a Path>,
{
    outputs.into_iter().any(|output| is_stale(output, newest_source))
}

/// Collect owned paths from a glob match set, used by tasks that need the
/// newest time of an entire source tree.
pub fn glob_paths(pattern: &str) -> Vec<PathBuf> {
    match glob::glob(pattern) {
        Ok(entries) => entries.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_output_is_stale() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        fs::write(&src, "x").unwrap();

        assert!(is_stale(&temp.path().join("missing"), mtime(&src)));
    }

    #[test]
    fn test_fresh_output_not_stale() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        let out = temp.path().join("a.out");
        fs::write(&src, "x").unwrap();
        fs::write(&out, "y").unwrap();

        // Output written at or after the source
        assert!(!source_newer(&src, &out));
    }

    #[test]
    fn test_newer_source_is_stale() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        let out = temp.path().join("a.out");
        fs::write(&out, "y").unwrap();
        fs::write(&src, "x").unwrap();

        let future = SystemTime::now() + std::time::Duration::from_secs(60);
        assert!(is_stale(&out, Some(future)));
    }

    #[test]
    fn test_any_stale_missing_sibling() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.scss");
        let out = temp.path().join("a.css");
        let min = temp.path().join("a.min.css");
        fs::write(&src, "x").unwrap();
        fs::write(&out, "y").unwrap();

        // One output missing makes the set stale even though the other is fresh
        assert!(any_stale([out.as_path(), min.as_path()], mtime(&src)));

        fs::write(&min, "z").unwrap();
        assert!(!any_stale([out.as_path(), min.as_path()], mtime(&src)));
    }

    #[test]
    fn test_newest_mtime_picks_max() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::write(&a, "1").unwrap();
        fs::write(&b, "2").unwrap();

        let newest = newest_mtime([&a, &b]).unwrap();
        assert!(newest >= mtime(&a).unwrap());
        assert!(newest >= mtime(&b).unwrap());
    }

    #[test]
    fn test_newest_mtime_empty() {
        let paths: Vec<PathBuf> = vec![];
        assert!(newest_mtime(paths).is_none());
    }

    #[test]
    fn test_glob_paths() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.scss"), "").unwrap();
        fs::write(temp.path().join("b.css"), "").unwrap();

        let found = glob_paths(&format!("{}/*.scss", temp.path().display()));
        assert_eq!(found.len(), 1);
    }
}
