//! Advisory lock serialising reconciliation passes on one run path.
//!
//! Periodic schedulers may start a new pass while an earlier one is still
//! deciding what to do. Both would otherwise see "no live supervisor" and
//! launch one each. The lock covers discovery through state persistence; it
//! is released before a pass blocks on its supervisor.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use thiserror::Error;
use tracing::{debug, info};
use xrdservmon_config::RunPaths;

const LOCK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lock");

/// Errors raised while taking the run lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The run directory could not be created.
    #[error("failed to prepare run directory '{path}': {source}")]
    RunDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The lock file could not be opened.
    #[error("failed to open lock file '{path}': {source}")]
    Open {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Locking failed for a reason other than contention.
    #[error("failed to lock '{path}': {source}")]
    Lock {
        /// Lock file path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Exclusive hold on a run path; released on drop.
pub struct RunLock {
    path: PathBuf,
    _lock: Flock<File>,
}

impl RunLock {
    /// Tries to take the lock without blocking.
    ///
    /// Returns `Ok(None)` when another invocation holds it.
    pub fn try_acquire(paths: &RunPaths) -> Result<Option<Self>, LockError> {
        fs::create_dir_all(paths.run_dir()).map_err(|source| LockError::RunDirectory {
            path: paths.run_dir().to_path_buf(),
            source,
        })?;
        let path = paths.lock_path().to_path_buf();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&path).map_err(|source| LockError::Open {
            path: path.clone(),
            source,
        })?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => {
                debug!(target: LOCK_TARGET, file = %path.display(), "acquired run lock");
                Ok(Some(Self { path, _lock: lock }))
            }
            Err((_, Errno::EAGAIN)) => {
                info!(
                    target: LOCK_TARGET,
                    file = %path.display(),
                    "run lock held by another invocation"
                );
                Ok(None)
            }
            Err((_, source)) => Err(LockError::Lock { path, source }),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        debug!(target: LOCK_TARGET, file = %self.path.display(), "released run lock");
    }
}
