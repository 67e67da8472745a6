//! Discovers which local daemons should be monitored.
//!
//! Daemons write their PID to `{base}/{instance}/{role}.pid`. Discovery
//! visits every instance directory, reads the PID of each known role and
//! keeps it only when the process table confirms a live process with the
//! role's name. Failures are per role: a missing or garbled PID file is
//! logged and skipped, and the remaining roles are still reported.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::pidfile::read_pid;
use crate::probe::ProcessProbe;
use crate::target::{DaemonRole, Target, TargetSet};

const DISCOVERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::discovery");

/// Builds the desired [`TargetSet`] from daemon PID files.
#[derive(Debug, Clone)]
pub struct TargetDiscovery<P> {
    probe: P,
}

impl<P: ProcessProbe> TargetDiscovery<P> {
    /// Creates a discovery pass validating PIDs with `probe`.
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// Scans `pid_path_base` and returns the live targets found there.
    ///
    /// When `pid_path_base` itself holds role PID files it is the single
    /// instance directory; otherwise each immediate subdirectory is one.
    pub fn discover(&self, pid_path_base: &Path) -> TargetSet {
        let mut targets = TargetSet::new();
        for instance_dir in instance_directories(pid_path_base) {
            for role in DaemonRole::ALL {
                if let Some(target) = self.resolve(&instance_dir, role) {
                    debug!(
                        target: DISCOVERY_TARGET,
                        role = %target.role,
                        instance = %target.instance_label,
                        pid = target.pid,
                        "adding monitor target"
                    );
                    targets.insert(target);
                }
            }
        }
        targets
    }

    fn resolve(&self, instance_dir: &Path, role: DaemonRole) -> Option<Target> {
        let pid_file = instance_dir.join(role.pid_file_name());
        let pid = match read_pid(&pid_file) {
            Ok(pid) => pid,
            Err(error) => {
                warn!(
                    target: DISCOVERY_TARGET,
                    %role,
                    error = %error,
                    "failed to read PID file for daemon"
                );
                return None;
            }
        };
        if !self.probe.is_alive(pid, role.process_name()) {
            warn!(
                target: DISCOVERY_TARGET,
                %role,
                pid,
                file = %pid_file.display(),
                "daemon named by PID file is not running"
            );
            return None;
        }
        Some(Target::new(role, instance_label(&pid_file), pid))
    }
}

fn instance_directories(pid_path_base: &Path) -> Vec<PathBuf> {
    let holds_role_files = DaemonRole::ALL
        .iter()
        .any(|role| pid_path_base.join(role.pid_file_name()).is_file());
    if holds_role_files {
        return vec![pid_path_base.to_path_buf()];
    }
    let entries = match fs::read_dir(pid_path_base) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(
                target: DISCOVERY_TARGET,
                base = %pid_path_base.display(),
                error = %error,
                "failed to scan PID path base"
            );
            return Vec::new();
        }
    };
    let mut directories: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    directories.sort();
    directories
}

fn instance_label(pid_file: &Path) -> String {
    pid_file
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
