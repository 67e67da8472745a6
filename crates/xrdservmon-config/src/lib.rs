//! Shared configuration for the xrdservmon reconciler.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, an
//! optional `.xrdservmon.toml` file, `XRDSERVMON_*` environment variables and
//! finally command-line flags. Loading never validates semantic requirements;
//! [`Config::monitor_settings`] turns the raw layers into the
//! [`MonitorSettings`] consumed by the reconciliation engine and reports
//! missing options as [`ConfigError`].

mod defaults;
mod logging;
mod runtime;
mod settings;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_REPORT_TO, DEFAULT_RUN_PATH, DEFAULT_SUPERVISOR_COMMAND,
    DEFAULT_SUPERVISOR_PROCESS_NAME, DEFAULT_TARGET_PORT, SERVER_PORT_ENV_VAR, default_log_filter,
    default_log_format, default_run_path, default_target_port,
};
pub use logging::LogFormat;
pub use runtime::{BOOKKEEPING_PREFIX, LOCK_FILE_NAME, RunPaths, STATE_FILE_NAME};
pub use settings::{ConfigError, MonitorSettings, SupervisorSettings};

/// Raw configuration merged from every layer.
///
/// Every option is optional at load time; accessors apply defaults and
/// [`Config::monitor_settings`] enforces the required ones.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "XRDSERVMON")]
pub struct Config {
    /// Base path storing the daemon PID files (`all.pidpath` plus instance name).
    pub target_pidpath: Option<Utf8PathBuf>,
    /// Port of the xrootd instance to monitor.
    pub target_port: Option<u16>,
    /// Storage element this server belongs to.
    pub se_name: Option<String>,
    /// Hostname or address to send reports to.
    pub report_to: Option<String>,
    /// Base path storing bookkeeping and state files.
    pub run_path: Option<Utf8PathBuf>,
    /// Log filter expression understood by `tracing-subscriber`.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Supervisor executable to launch.
    pub supervisor_command: Option<Utf8PathBuf>,
    /// Process name reported by a running supervisor.
    pub supervisor_process_name: Option<String>,
    /// Terminate an outdated supervisor before launching its replacement.
    pub terminate_superseded: Option<bool>,
}

impl Config {
    /// Log filter expression, falling back to [`DEFAULT_LOG_FILTER`].
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log output format, falling back to [`default_log_format`].
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Port of the monitored daemon.
    #[must_use]
    pub fn target_port(&self) -> u16 {
        self.target_port.unwrap_or_else(default_target_port)
    }

    /// Collector host the supervisor reports to.
    #[must_use]
    pub fn report_to(&self) -> &str {
        self.report_to.as_deref().unwrap_or(DEFAULT_REPORT_TO)
    }

    /// Settings for launching and recognising the supervisor.
    #[must_use]
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            command: self.supervisor_command.as_ref().map_or_else(
                || DEFAULT_SUPERVISOR_COMMAND.into(),
                |command| command.clone().into_std_path_buf(),
            ),
            process_name: self
                .supervisor_process_name
                .clone()
                .unwrap_or_else(|| DEFAULT_SUPERVISOR_PROCESS_NAME.to_owned()),
            terminate_superseded: self.terminate_superseded.unwrap_or(true),
        }
    }

    /// Validates the loaded layers into reconciliation inputs.
    pub fn monitor_settings(&self) -> Result<MonitorSettings, ConfigError> {
        let pid_path_base = self
            .target_pidpath
            .as_ref()
            .ok_or(ConfigError::MissingOption {
                option: "target-pidpath",
            })?;
        if pid_path_base.as_str().trim().is_empty() {
            return Err(ConfigError::EmptyOption {
                option: "target-pidpath",
            });
        }
        let se_name = self
            .se_name
            .as_deref()
            .ok_or(ConfigError::MissingOption { option: "se-name" })?;
        if se_name.trim().is_empty() {
            return Err(ConfigError::EmptyOption { option: "se-name" });
        }
        Ok(MonitorSettings {
            pid_path_base: pid_path_base.clone().into_std_path_buf(),
            target_port: self.target_port(),
            se_name: se_name.to_owned(),
            report_to: self.report_to().to_owned(),
            run_path: self.run_path(),
        })
    }

    fn run_path(&self) -> std::path::PathBuf {
        self.run_path
            .as_ref()
            .map_or_else(default_run_path, |path| path.clone().into_std_path_buf())
    }
}
