//! Build result types.
//!
//! Contains types for representing the outcome of task invocations and full
//! build passes. A failed file never aborts its task; failures are collected
//! here and surfaced in the summary.

use crate::paths::AssetKind;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome for a single source file within a task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Output was (re)written
    Built,
    /// Source was up to date, output left untouched
    Skipped,
    /// This file's transform chain failed
    Failed(String),
}

impl FileStatus {
    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, FileStatus::Failed(_))
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Built => write!(f, "built"),
            FileStatus::Skipped => write!(f, "skipped"),
            FileStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result for one source file.
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Source path the result refers to
    pub source: PathBuf,
    /// Outcome
    pub status: FileStatus,
    /// Output files produced
    pub outputs: Vec<PathBuf>,
}

impl FileResult {
    /// A file that was rebuilt.
    pub fn built(source: PathBuf, outputs: Vec<PathBuf>) -> Self {
        Self { source, status: FileStatus::Built, outputs }
    }

    /// A file whose output was already up to date.
    pub fn skipped(source: PathBuf) -> Self {
        Self { source, status: FileStatus::Skipped, outputs: vec![] }
    }

    /// A file whose transform failed.
    pub fn failed(source: PathBuf, error: impl Into<String>) -> Self {
        Self { source, status: FileStatus::Failed(error.into()), outputs: vec![] }
    }
}

/// Result of one task invocation (one category, one pass).
#[derive(Debug)]
pub struct TaskReport {
    /// Category the task processed
    pub kind: AssetKind,
    /// Per-file outcomes
    pub files: Vec<FileResult>,
    /// Task-level failure (glob error, unreadable output dir); when set the
    /// whole invocation failed before or during the batch
    pub error: Option<String>,
    /// Invocation duration
    pub duration: Duration,
}

impl TaskReport {
    /// Create an empty report for a category.
    pub fn new(kind: AssetKind) -> Self {
        Self { kind, files: vec![], error: None, duration: Duration::ZERO }
    }

    /// Create a report for an invocation that failed as a whole.
    pub fn task_failed(kind: AssetKind, error: impl Into<String>) -> Self {
        Self { kind, files: vec![], error: Some(error.into()), duration: Duration::ZERO }
    }

    /// Record a per-file result.
    pub fn push(&mut self, result: FileResult) {
        self.files.push(result);
    }

    pub fn built_count(&self) -> usize {
        self.files.iter().filter(|r| r.status == FileStatus::Built).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files.iter().filter(|r| r.status == FileStatus::Skipped).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Whether anything was actually rewritten, which is what decides if a
    /// reload broadcast is worth sending.
    pub fn changed(&self) -> bool {
        self.built_count() > 0
    }

    /// Check the invocation succeeded (no task-level error, no failed files).
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.failed_count() == 0
    }

    /// One-line summary in the console style used by watch mode.
    pub fn summary(&self) -> String {
        if let Some(err) = &self.error {
            return format!("{}: task failed: {}", self.kind, err);
        }
        let mut line = format!(
            "{}: {} built, {} skipped",
            self.kind,
            self.built_count(),
            self.skipped_count()
        );
        if self.failed_count() > 0 {
            line.push_str(&format!(", {} failed", self.failed_count()));
        }
        line
    }

    /// Failed file results.
    pub fn failures(&self) -> Vec<&FileResult> {
        self.files.iter().filter(|r| r.status.is_failure()).collect()
    }
}

/// Result of a complete build pass across all tasks.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Per-task reports
    pub tasks: Vec<TaskReport>,
    /// Total wall-clock duration
    pub total_duration: Duration,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: TaskReport) {
        self.tasks.push(report);
    }

    /// Check the pass succeeded across every task.
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(TaskReport::is_success)
    }

    /// Multi-line summary of the pass.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for task in &self.tasks {
            lines.push(format!("  {}", task.summary()));
            for failure in task.failures() {
                lines.push(format!("    - {}: {}", failure.source.display(), failure.status));
            }
        }
        let status = if self.is_success() { "Build succeeded" } else { "Build finished with errors" };
        lines.insert(0, format!("{} in {:?}", status, self.total_duration));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_status_display() {
        assert_eq!(FileStatus::Built.to_string(), "built");
        assert_eq!(FileStatus::Skipped.to_string(), "skipped");
        assert_eq!(FileStatus::Failed("boom".into()).to_string(), "failed: boom");
    }

    #[test]
    fn test_task_report_counts() {
        let mut report = TaskReport::new(AssetKind::Templates);
        report.push(FileResult::built(PathBuf::from("a.njk"), vec![PathBuf::from("a.html")]));
        report.push(FileResult::skipped(PathBuf::from("b.njk")));
        report.push(FileResult::failed(PathBuf::from("c.njk"), "missing data"));

        assert_eq!(report.built_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.changed());
        assert!(!report.is_success());
    }

    #[test]
    fn test_task_report_success() {
        let mut report = TaskReport::new(AssetKind::Styles);
        report.push(FileResult::skipped(PathBuf::from("main.scss")));
        assert!(report.is_success());
        assert!(!report.changed());
    }

    #[test]
    fn test_task_level_failure() {
        let report = TaskReport::task_failed(AssetKind::Images, "output dir unwritable");
        assert!(!report.is_success());
        assert!(report.summary().contains("task failed"));
    }

    #[test]
    fn test_build_report_summary() {
        let mut build = BuildReport::new();
        let mut task = TaskReport::new(AssetKind::Templates);
        task.push(FileResult::failed(PathBuf::from("page.njk"), "no data record"));
        build.push(task);

        let summary = build.summary();
        assert!(summary.contains("errors"));
        assert!(summary.contains("page.njk"));
        assert!(!build.is_success());
    }
}
