use std::env;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Environment variable the xrootd tooling uses to publish the server port.
pub const SERVER_PORT_ENV_VAR: &str = "XRDSERVERPORT";

/// Port assumed when neither configuration nor environment names one.
pub const DEFAULT_TARGET_PORT: u16 = 1094;

/// Collector host used when no report destination is configured.
pub const DEFAULT_REPORT_TO: &str = "localhost";

/// Directory holding bookkeeping and state files by default.
pub const DEFAULT_RUN_PATH: &str = "/tmp";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Executable launched to perform the actual monitoring.
pub const DEFAULT_SUPERVISOR_COMMAND: &str = "servMon.sh";

/// Process name the running supervisor reports in the process table.
pub const DEFAULT_SUPERVISOR_PROCESS_NAME: &str = "perl";

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Port of the monitored daemon when none is configured.
///
/// Falls back to [`DEFAULT_TARGET_PORT`] when `XRDSERVERPORT` is unset or
/// does not hold a valid port number.
pub fn default_target_port() -> u16 {
    env::var(SERVER_PORT_ENV_VAR)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_TARGET_PORT)
}

/// Directory holding bookkeeping and state files by default.
pub fn default_run_path() -> PathBuf {
    PathBuf::from(DEFAULT_RUN_PATH)
}
