//! Persists the target set of the currently running supervisor.
//!
//! A later reconciliation pass compares this record with freshly
//! discovered targets to detect drift without asking the supervisor itself.
//! Missing or corrupt state is never an error on load: it simply means there
//! is no prior state, and the engine will launch a fresh supervisor.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use xrdservmon_config::RunPaths;

use crate::files::atomic_write;
use crate::target::TargetSet;

const STATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::state");

/// A launched supervisor and the targets it was launched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorRecord {
    /// PID of the launched supervisor.
    pub pid: u32,
    /// Targets passed to the supervisor.
    pub targets: TargetSet,
}

/// Errors raised while persisting state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Serialising the record failed.
    #[error("failed to serialise supervisor state: {source}")]
    Serialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Writing the state file failed.
    #[error("failed to write supervisor state '{path}': {source}")]
    Write {
        /// State file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Durable storage for the last launched [`SupervisorRecord`].
#[cfg_attr(test, mockall::automock)]
pub trait StateStore {
    /// Persists `record` under `run_path`, replacing any previous record.
    fn save(&self, run_path: &Path, record: &SupervisorRecord) -> Result<(), StateError>;

    /// Returns the persisted targets, or an empty set when nothing usable is
    /// stored.
    fn load(&self, run_path: &Path) -> TargetSet;
}

/// On-disk layout of the state file.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    /// Executable that wrote the record; informational only.
    process: String,
    pid: u32,
    targets: TargetSet,
}

/// [`StateStore`] writing JSON to `xrdservmon_state.json` in the run path.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    writer: String,
}

impl JsonStateStore {
    /// Creates a store identifying records by the current executable.
    #[must_use]
    pub fn new() -> Self {
        let writer = env::current_exe()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_owned());
        Self::with_writer(writer)
    }

    /// Creates a store recording `writer` as the identifier of the author.
    #[must_use]
    pub fn with_writer(writer: impl Into<String>) -> Self {
        Self {
            writer: writer.into(),
        }
    }
}

impl Default for JsonStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for JsonStateStore {
    fn save(&self, run_path: &Path, record: &SupervisorRecord) -> Result<(), StateError> {
        let paths = RunPaths::new(run_path);
        let state = PersistedState {
            process: self.writer.clone(),
            pid: record.pid,
            targets: record.targets.clone(),
        };
        let mut payload = serde_json::to_vec_pretty(&state)?;
        payload.push(b'\n');
        atomic_write(paths.state_path(), &payload).map_err(|source| StateError::Write {
            path: paths.state_path().to_path_buf(),
            source,
        })?;
        info!(
            target: STATE_TARGET,
            pid = record.pid,
            targets = record.targets.len(),
            file = %paths.state_path().display(),
            "supervisor state written"
        );
        Ok(())
    }

    fn load(&self, run_path: &Path) -> TargetSet {
        let paths = RunPaths::new(run_path);
        let path = paths.state_path();
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!(
                        target: STATE_TARGET,
                        file = %path.display(),
                        error = %error,
                        "failed to read supervisor state; assuming none"
                    );
                }
                return TargetSet::new();
            }
        };
        match serde_json::from_slice::<PersistedState>(&content) {
            Ok(state) => {
                debug!(
                    target: STATE_TARGET,
                    pid = state.pid,
                    writer = %state.process,
                    "loaded supervisor state"
                );
                state.targets
            }
            Err(error) => {
                warn!(
                    target: STATE_TARGET,
                    file = %path.display(),
                    error = %error,
                    "supervisor state is corrupt; assuming none"
                );
                TargetSet::new()
            }
        }
    }
}
