//! Validated settings handed to the reconciliation engine.

use std::path::PathBuf;

use thiserror::Error;

/// Inputs of a single reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Base directory containing the per-instance daemon PID files.
    pub pid_path_base: PathBuf,
    /// Port of the daemon being monitored, forwarded to the supervisor.
    pub target_port: u16,
    /// Storage element name used to qualify every reported label.
    pub se_name: String,
    /// Host or address of the remote collector.
    pub report_to: String,
    /// Directory holding bookkeeping, state, and lock files.
    pub run_path: PathBuf,
}

/// How the supervisor executable is launched and recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Executable started for each new supervisor.
    pub command: PathBuf,
    /// Name the running supervisor reports in the process table.
    pub process_name: String,
    /// Whether a superseded supervisor is sent `SIGTERM` before a replacement
    /// is launched.
    pub terminate_superseded: bool,
}

/// Errors raised while validating loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required option was absent from every configuration layer.
    #[error("missing required option '{option}'")]
    MissingOption {
        /// Name of the option, as spelt on the command line.
        option: &'static str,
    },
    /// A required option was present but blank.
    #[error("option '{option}' must not be empty")]
    EmptyOption {
        /// Name of the option, as spelt on the command line.
        option: &'static str,
    },
}
