//! Keeps one correctly configured monitoring supervisor running for the
//! xrootd and cmsd daemons of a storage server.
//!
//! Each invocation is a single reconciliation pass: discover the daemons
//! that should be monitored from their PID files, find the supervisor a
//! previous pass launched, and launch a replacement when the two disagree.
//! Passes are idempotent and intended to be re-run by an external scheduler
//! such as cron.
//!
//! The moving parts are injected behind traits so a pass can be exercised
//! without touching the real process table:
//!
//! - [`ProcessProbe`] answers whether a PID is live under an expected name.
//! - [`StateStore`] remembers which targets the running supervisor watches.
//! - [`SupervisorLauncher`] starts the external supervisor.
//! - [`SupervisorTerminator`] stops a supervisor that has been superseded.
//!
//! [`ReconcileEngine::ensure`] ties them together. Configuration is loaded
//! through [`xrdservmon_config`] by [`run`].

mod bootstrap;
mod discovery;
mod files;
mod launcher;
mod lock;
mod pidfile;
mod probe;
mod reconcile;
mod registry;
mod state;
mod target;
mod telemetry;
mod terminate;

pub use bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, run, run_with};
pub use discovery::TargetDiscovery;
pub use launcher::{
    COLLECTOR_HOST_ENV_VAR, CommandLauncher, LaunchError, LaunchRequest, MONITORED_PORT_ENV_VAR,
    MonitoredProcess, SupervisorHandle, SupervisorLauncher,
};
pub use lock::{LockError, RunLock};
pub use pidfile::PidFileError;
pub use probe::{ProcessProbe, ProcfsProbe};
pub use reconcile::{NOTHING_TO_DO, ReconcileEngine, ReconcileError, SystemEngine, ensure};
pub use registry::{LiveSupervisors, SupervisorRegistry};
pub use state::{JsonStateStore, StateError, StateStore, SupervisorRecord};
pub use target::{DaemonRole, Target, TargetSet};
pub use telemetry::TelemetryError;
pub use terminate::{SignalTerminator, SupervisorTerminator, TerminateError};

#[cfg(test)]
mod tests;
