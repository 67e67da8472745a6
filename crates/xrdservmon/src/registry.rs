//! Tracks supervisors launched by earlier reconciliation passes.
//!
//! Each supervisor records its PID in a bookkeeping file under the run
//! directory. Listing live supervisors doubles as garbage collection:
//! bookkeeping whose process has gone (or was replaced by an unrelated
//! program reusing the PID) is deleted while the listing is consumed.

use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use xrdservmon_config::RunPaths;

use crate::pidfile::{PidFileError, read_pid};
use crate::probe::ProcessProbe;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Finds live supervisors through their bookkeeping files.
#[derive(Debug, Clone)]
pub struct SupervisorRegistry<P> {
    probe: P,
    process_name: String,
}

impl<P: ProcessProbe> SupervisorRegistry<P> {
    /// Creates a registry recognising supervisors reporting `process_name`.
    pub fn new(probe: P, process_name: impl Into<String>) -> Self {
        Self {
            probe,
            process_name: process_name.into(),
        }
    }

    /// Lazily yields the PID of every live supervisor under `run_path`.
    ///
    /// Stale bookkeeping is removed as the iterator advances, so callers that
    /// need the cleanup must exhaust it.
    pub fn list_live(&self, run_path: &Path) -> LiveSupervisors<'_, P> {
        let entries = match fs::read_dir(run_path) {
            Ok(entries) => Some(entries),
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!(
                        target: REGISTRY_TARGET,
                        run_path = %run_path.display(),
                        error = %error,
                        "failed to scan run path for supervisors"
                    );
                }
                None
            }
        };
        LiveSupervisors {
            registry: self,
            entries,
        }
    }

    fn inspect(&self, path: &Path) -> Option<u32> {
        let pid = match read_pid(path) {
            Ok(pid) => pid,
            Err(error) if error.is_missing() => return None,
            Err(error @ PidFileError::Read { .. }) => {
                warn!(
                    target: REGISTRY_TARGET,
                    error = %error,
                    "skipping unreadable supervisor bookkeeping"
                );
                return None;
            }
            Err(PidFileError::Empty { path }) => {
                // A supervisor creates the file before writing its PID.
                debug!(
                    target: REGISTRY_TARGET,
                    file = %path.display(),
                    "supervisor bookkeeping not written yet; keeping it"
                );
                return None;
            }
            Err(error @ PidFileError::Parse { .. }) => {
                debug!(
                    target: REGISTRY_TARGET,
                    error = %error,
                    "supervisor bookkeeping is garbled"
                );
                remove_stale(path);
                return None;
            }
        };
        if self.probe.is_alive(pid, &self.process_name) {
            debug!(target: REGISTRY_TARGET, pid, "monitor exists");
            Some(pid)
        } else {
            debug!(target: REGISTRY_TARGET, pid, "monitor defunct");
            remove_stale(path);
            None
        }
    }
}

/// Iterator over live supervisor PIDs returned by
/// [`SupervisorRegistry::list_live`].
pub struct LiveSupervisors<'a, P> {
    registry: &'a SupervisorRegistry<P>,
    entries: Option<ReadDir>,
}

impl<P: ProcessProbe> Iterator for LiveSupervisors<'_, P> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries.as_mut()?;
        for entry in entries.by_ref() {
            let Some(path) = bookkeeping_path(entry) else {
                continue;
            };
            if let Some(pid) = self.registry.inspect(&path) {
                return Some(pid);
            }
        }
        None
    }
}

fn bookkeeping_path(entry: io::Result<fs::DirEntry>) -> Option<PathBuf> {
    let entry = entry.ok()?;
    let name = entry.file_name();
    let is_bookkeeping = name.to_str().is_some_and(RunPaths::is_bookkeeping_file);
    (is_bookkeeping && entry.path().is_file()).then(|| entry.path())
}

fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            warn!(
                target: REGISTRY_TARGET,
                file = %path.display(),
                error = %error,
                "failed to remove stale supervisor bookkeeping"
            );
        }
    }
}
