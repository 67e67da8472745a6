//! Drives one reconciliation pass.
//!
//! A pass compares the daemons that should be monitored with the supervisor
//! that is running, and launches a replacement when they disagree. The engine
//! never loops: an external scheduler re-invokes it, and a pass that launches
//! a supervisor blocks until that supervisor exits.

use thiserror::Error;
use tracing::{error, info, warn};
use xrdservmon_config::{MonitorSettings, RunPaths, SupervisorSettings};

use crate::discovery::TargetDiscovery;
use crate::launcher::{CommandLauncher, LaunchError, LaunchRequest, SupervisorLauncher};
use crate::lock::{LockError, RunLock};
use crate::probe::{ProcessProbe, ProcfsProbe};
use crate::registry::SupervisorRegistry;
use crate::state::{JsonStateStore, StateStore, SupervisorRecord};
use crate::terminate::{SignalTerminator, SupervisorTerminator};

const RECONCILE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::reconcile");

/// Exit code for passes that leave the system untouched.
pub const NOTHING_TO_DO: i32 = 0;

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The run lock could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// The supervisor could not be started or awaited.
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Reconciles discovered daemons with the running supervisor.
#[derive(Debug)]
pub struct ReconcileEngine<P, S, L, T> {
    probe: P,
    store: S,
    launcher: L,
    terminator: T,
    supervisor: SupervisorSettings,
}

/// Engine wired to the host's process table and filesystem.
pub type SystemEngine =
    ReconcileEngine<ProcfsProbe, JsonStateStore, CommandLauncher, SignalTerminator>;

impl SystemEngine {
    /// Builds an engine using `/proc`, JSON state and real child processes.
    #[must_use]
    pub fn system(supervisor: SupervisorSettings) -> Self {
        ReconcileEngine::new(
            ProcfsProbe::new(),
            JsonStateStore::new(),
            CommandLauncher::new(),
            SignalTerminator::new(),
            supervisor,
        )
    }
}

impl<P, S, L, T> ReconcileEngine<P, S, L, T>
where
    P: ProcessProbe,
    S: StateStore,
    L: SupervisorLauncher,
    T: SupervisorTerminator,
{
    /// Assembles an engine from its collaborators.
    pub fn new(
        probe: P,
        store: S,
        launcher: L,
        terminator: T,
        supervisor: SupervisorSettings,
    ) -> Self {
        Self {
            probe,
            store,
            launcher,
            terminator,
            supervisor,
        }
    }

    /// Ensures exactly one correctly configured supervisor runs.
    ///
    /// Returns [`NOTHING_TO_DO`] when another pass holds the run lock, when
    /// the running supervisor already monitors the discovered daemons, or
    /// when there is nothing to monitor. Otherwise launches a supervisor and
    /// returns its exit code once it ends.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the run lock cannot be prepared or the
    /// supervisor cannot be started or awaited.
    pub fn ensure(&self, settings: &MonitorSettings) -> Result<i32, ReconcileError> {
        let run_paths = RunPaths::new(&settings.run_path);
        let Some(lock) = RunLock::try_acquire(&run_paths)? else {
            return Ok(NOTHING_TO_DO);
        };

        let targets = TargetDiscovery::new(&self.probe).discover(&settings.pid_path_base);
        let live: Vec<u32> = SupervisorRegistry::new(&self.probe, &self.supervisor.process_name)
            .list_live(&settings.run_path)
            .collect();

        if let [pid] = live.as_slice() {
            if self.store.load(&settings.run_path) == targets {
                info!(
                    target: RECONCILE_TARGET,
                    pid = *pid,
                    targets = targets.len(),
                    "monitor already running with current targets"
                );
                return Ok(NOTHING_TO_DO);
            }
            info!(target: RECONCILE_TARGET, pid = *pid, "replacing outdated monitor");
        } else if live.len() > 1 {
            warn!(
                target: RECONCILE_TARGET,
                supervisors = ?live,
                "multiple monitors running; starting a single replacement"
            );
        }

        if targets.is_empty() {
            info!(
                target: RECONCILE_TARGET,
                pid_path = %settings.pid_path_base.display(),
                "no daemons to monitor"
            );
            return Ok(NOTHING_TO_DO);
        }

        if self.supervisor.terminate_superseded {
            self.terminate_all(&live);
        }

        let request = LaunchRequest::new(&targets, settings, &self.supervisor);
        let mut handle = self.launcher.launch(&request)?;
        let record = SupervisorRecord {
            pid: handle.pid(),
            targets,
        };
        if let Err(source) = self.store.save(&settings.run_path, &record) {
            error!(
                target: RECONCILE_TARGET,
                pid = record.pid,
                error = %source,
                "failed to persist monitor state"
            );
        }
        drop(lock);

        let code = handle.wait()?;
        info!(target: RECONCILE_TARGET, pid = record.pid, code, "monitor exited");
        Ok(code)
    }

    fn terminate_all(&self, live: &[u32]) {
        for &pid in live {
            if let Err(source) = self.terminator.terminate(pid) {
                warn!(
                    target: RECONCILE_TARGET,
                    pid,
                    error = %source,
                    "failed to stop superseded monitor"
                );
            }
        }
    }
}

/// Runs one pass against the host system.
///
/// # Errors
///
/// See [`ReconcileEngine::ensure`].
pub fn ensure(
    settings: &MonitorSettings,
    supervisor: &SupervisorSettings,
) -> Result<i32, ReconcileError> {
    SystemEngine::system(supervisor.clone()).ensure(settings)
}
