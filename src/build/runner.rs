//! One-shot concurrent execution of every transform task.
//!
//! All five tasks run concurrently on scoped threads; the caller is
//! responsible for running [`clean_output`](super::clean_output) first when a
//! clean pass is wanted, since the clean must complete before any task may
//! write. Categories own disjoint output subtrees (checked by the path
//! registry), so the tasks need no locking.

use crate::build::{BuildReport, TaskReport};
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use crate::tasks;
use std::time::Instant;

/// Run every transform task once, concurrently, and collect a combined
/// report. Task panics are converted into task-level failures so one
/// misbehaving category cannot take the pass down.
pub fn run_all(registry: &PathRegistry, reloader: &Reloader, force: bool) -> BuildReport {
    let start = Instant::now();
    let mut build = BuildReport::new();

    let reports: Vec<TaskReport> = std::thread::scope(|s| {
        let handles: Vec<_> = AssetKind::TASKS
            .iter()
            .map(|&kind| s.spawn(move || tasks::run(kind, registry, reloader, force)))
            .collect();

        handles
            .into_iter()
            .zip(AssetKind::TASKS)
            .map(|(handle, kind)| {
                handle
                    .join()
                    .unwrap_or_else(|_| TaskReport::task_failed(kind, "task panicked"))
            })
            .collect()
    });

    for report in reports {
        tracing::debug!(task = %report.kind, "{}", report.summary());
        build.push(report);
    }

    build.total_duration = start.elapsed();
    build
}
