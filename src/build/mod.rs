//! Build orchestration: staleness checks, output cleaning, result types,
//! and the concurrent one-shot runner.

pub mod clean;
pub mod result;
pub mod runner;
pub mod stale;

pub use clean::{clean_output, CleanError};
pub use result::{BuildReport, FileResult, FileStatus, TaskReport};
pub use runner::run_all;
