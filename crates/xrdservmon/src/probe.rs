//! Liveness and identity checks against the live process table.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

const PROBE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::probe");
const PROCFS_ROOT: &str = "/proc";

/// Answers whether a PID currently belongs to a process with a given name.
///
/// This is the only authority used to tell a live, correctly identified
/// process from a stale PID value; a PID file existing proves nothing.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessProbe {
    /// Returns true when `pid` is live and its command name equals
    /// `expected_name` exactly. Never fails: any inspection problem is a
    /// negative answer.
    fn is_alive(&self, pid: u32, expected_name: &str) -> bool;
}

impl<T: ProcessProbe + ?Sized> ProcessProbe for &T {
    fn is_alive(&self, pid: u32, expected_name: &str) -> bool {
        (**self).is_alive(pid, expected_name)
    }
}

/// Probe reading `<root>/<pid>/comm` from procfs.
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    root: PathBuf,
}

impl ProcfsProbe {
    /// Builds a probe over the system procfs mount.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(PROCFS_ROOT)
    }

    /// Builds a probe over an alternative procfs tree.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the inspected process table.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn command_name(&self, pid: u32) -> Option<String> {
        let path = self.root.join(pid.to_string()).join("comm");
        match fs::read_to_string(&path) {
            Ok(content) => content.lines().next().map(|line| line.trim().to_owned()),
            Err(error) => {
                trace!(
                    target: PROBE_TARGET,
                    pid,
                    file = %path.display(),
                    error = %error,
                    "process not inspectable"
                );
                None
            }
        }
    }
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for ProcfsProbe {
    fn is_alive(&self, pid: u32, expected_name: &str) -> bool {
        if pid == 0 {
            return false;
        }
        self.command_name(pid)
            .is_some_and(|name| name == expected_name)
    }
}
