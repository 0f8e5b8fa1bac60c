//! Output tree cleaning.
//!
//! The clean task deletes the entire output root and gates every transform
//! task in the one-shot build sequence: nothing may write into the output
//! tree until the delete has completed, otherwise a task could write an
//! artifact that is immediately removed.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error deleting the output tree. Fatal to the startup sequence.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Recursively delete the output root. A missing root is success.
pub fn clean_output(root: &Path) -> Result<(), CleanError> {
    match std::fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CleanError::Remove { path: root.to_path_buf(), source: e }),
    }
}
