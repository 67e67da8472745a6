//! Starts the external supervisor process.
//!
//! A [`LaunchRequest`] is the typed description of a supervisor invocation.
//! It is translated into the supervisor's positional calling convention only
//! by [`LaunchRequest::arguments`] and [`LaunchRequest::environment`], so the
//! translation can be checked without spawning anything.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, info};
use xrdservmon_config::{MonitorSettings, RunPaths, SupervisorSettings};

use crate::target::TargetSet;

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launcher");

/// Environment variable naming the remote collector.
pub const COLLECTOR_HOST_ENV_VAR: &str = "MONALISA_HOST";

/// Environment variable naming the port of the monitored daemon.
pub const MONITORED_PORT_ENV_VAR: &str = xrdservmon_config::SERVER_PORT_ENV_VAR;

/// Exit code reported when a supervisor ends without one.
const UNKNOWN_EXIT_CODE: i32 = 1;

/// One labelled PID handed to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredProcess {
    /// Composite label, `{se_name}_{instance}_{role}`.
    pub label: String,
    /// PID of the daemon.
    pub pid: u32,
}

/// Typed description of a supervisor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Supervisor executable.
    pub command: PathBuf,
    /// Bookkeeping path the supervisor records its PID under.
    pub bookkeeping_path: PathBuf,
    /// Service identifier, `{se_name}_xrootd`.
    pub identifier: String,
    /// Daemons to monitor, in ascending PID order.
    pub processes: Vec<MonitoredProcess>,
    /// Address of the remote collector.
    pub collector_host: String,
    /// Port of the monitored daemon.
    pub monitored_port: u16,
}

impl LaunchRequest {
    /// Builds the request for monitoring `targets` under `settings`.
    #[must_use]
    pub fn new(
        targets: &TargetSet,
        settings: &MonitorSettings,
        supervisor: &SupervisorSettings,
    ) -> Self {
        let run_paths = RunPaths::new(&settings.run_path);
        Self {
            command: supervisor.command.clone(),
            bookkeeping_path: run_paths.bookkeeping_path().to_path_buf(),
            identifier: format!("{}_xrootd", settings.se_name),
            processes: targets
                .iter()
                .map(|target| MonitoredProcess {
                    label: target.composite_label(&settings.se_name),
                    pid: target.pid,
                })
                .collect(),
            collector_host: settings.report_to.clone(),
            monitored_port: settings.target_port,
        }
    }

    /// Positional arguments in the supervisor's calling convention:
    /// `-p <bookkeeping> -f <identifier> <label> <pid> ...`.
    #[must_use]
    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments = vec![
            OsString::from("-p"),
            self.bookkeeping_path.clone().into_os_string(),
            OsString::from("-f"),
            OsString::from(&self.identifier),
        ];
        for process in &self.processes {
            arguments.push(OsString::from(&process.label));
            arguments.push(OsString::from(process.pid.to_string()));
        }
        arguments
    }

    /// Variables layered over the inherited environment.
    #[must_use]
    pub fn environment(&self) -> [(&'static str, String); 2] {
        [
            (COLLECTOR_HOST_ENV_VAR, self.collector_host.clone()),
            (MONITORED_PORT_ENV_VAR, self.monitored_port.to_string()),
        ]
    }

    /// Builds the command ready to spawn.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.command);
        command.args(self.arguments());
        command.envs(self.environment());
        command
    }
}

/// Errors raised while starting or waiting on a supervisor.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The supervisor executable could not be started.
    #[error("failed to spawn supervisor {command:?}: {source}")]
    Spawn {
        /// Executable that failed to start.
        command: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting for the supervisor to exit failed.
    #[error("failed to wait for supervisor pid {pid}: {source}")]
    Wait {
        /// PID of the supervisor.
        pid: u32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// A started supervisor.
pub trait SupervisorHandle {
    /// PID of the supervisor process.
    fn pid(&self) -> u32;

    /// Blocks until the supervisor exits and returns its exit code.
    fn wait(&mut self) -> Result<i32, LaunchError>;
}

/// Starts supervisors. Implementations never wait for completion.
pub trait SupervisorLauncher {
    /// Starts the supervisor described by `request`.
    fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn SupervisorHandle>, LaunchError>;
}

impl<T: SupervisorLauncher + ?Sized> SupervisorLauncher for &T {
    fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn SupervisorHandle>, LaunchError> {
        (**self).launch(request)
    }
}

/// Launcher spawning the supervisor as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLauncher;

impl CommandLauncher {
    /// Builds a new launcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SupervisorLauncher for CommandLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn SupervisorHandle>, LaunchError> {
        debug!(
            target: LAUNCH_TARGET,
            command = %request.command.display(),
            arguments = ?request.arguments(),
            environment = ?request.environment(),
            "starting monitor"
        );
        let child = request
            .to_command()
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                command: request.command.clone(),
                source,
            })?;
        info!(
            target: LAUNCH_TARGET,
            pid = child.id(),
            targets = request.processes.len(),
            "monitor started"
        );
        Ok(Box::new(ChildHandle { child }))
    }
}

/// Handle over a spawned child process.
#[derive(Debug)]
struct ChildHandle {
    child: Child,
}

impl SupervisorHandle for ChildHandle {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn wait(&mut self) -> Result<i32, LaunchError> {
        let status = self.child.wait().map_err(|source| LaunchError::Wait {
            pid: self.child.id(),
            source,
        })?;
        Ok(exit_code(status))
    }
}

/// Maps an exit status to a shell-style exit code.
///
/// A process killed by a signal reports `128 + signal`.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    UNKNOWN_EXIT_CODE
}
