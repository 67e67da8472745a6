//! Derives the run-path layout shared by every reconciliation pass.
//!
//! The run directory houses the supervisor bookkeeping files, the persisted
//! reconciliation state, and the advisory lock. Successive invocations must
//! agree on these names, otherwise a later run cannot recognise the
//! supervisor an earlier run launched.

use std::path::{Path, PathBuf};

/// File name prefix shared by every supervisor bookkeeping file.
///
/// The supervisor may append suffixes to the path it is handed, so discovery
/// matches on the prefix rather than the exact name.
pub const BOOKKEEPING_PREFIX: &str = "xrdservmon.pid";

/// File name of the persisted reconciliation state.
pub const STATE_FILE_NAME: &str = "xrdservmon_state.json";

/// File name of the advisory lock serialising concurrent invocations.
pub const LOCK_FILE_NAME: &str = "xrdservmon.lock";

/// Canonical paths for artefacts written under the run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    run_dir: PathBuf,
    bookkeeping_path: PathBuf,
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl RunPaths {
    /// Derives the layout rooted at `run_dir`.
    #[must_use]
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        let run_dir = run_dir.into();
        Self {
            bookkeeping_path: run_dir.join(BOOKKEEPING_PREFIX),
            state_path: run_dir.join(STATE_FILE_NAME),
            lock_path: run_dir.join(LOCK_FILE_NAME),
            run_dir,
        }
    }

    /// Directory holding run artefacts.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        self.run_dir.as_path()
    }

    /// Path handed to the supervisor for its own PID bookkeeping.
    #[must_use]
    pub fn bookkeeping_path(&self) -> &Path {
        self.bookkeeping_path.as_path()
    }

    /// Path to the persisted reconciliation state.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        self.state_path.as_path()
    }

    /// Path to the advisory lock file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Returns true when `file_name` names a supervisor bookkeeping file.
    #[must_use]
    pub fn is_bookkeeping_file(file_name: &str) -> bool {
        file_name.starts_with(BOOKKEEPING_PREFIX)
    }
}
