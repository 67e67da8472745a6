//! Invocation orchestration: configuration, telemetry, then one pass.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::error;

use xrdservmon_config::{Config, ConfigError};

use crate::reconcile::{self, ReconcileError};
use crate::telemetry::{self, TelemetryError};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader {
    /// Loads the merged configuration layers.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors that end an invocation with a failure status.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Loaded configuration is incomplete.
    #[error("invalid configuration: {source}")]
    Settings {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// The reconciliation pass failed.
    #[error("reconciliation failed: {source}")]
    Reconcile {
        /// Engine failure.
        #[source]
        source: ReconcileError,
    },
}

impl BootstrapError {
    /// Whether the error was already reported through telemetry.
    ///
    /// Failures before telemetry is installed have nowhere to go but stderr.
    #[must_use]
    pub fn is_logged(&self) -> bool {
        matches!(self, Self::Settings { .. } | Self::Reconcile { .. })
    }
}

/// Runs one invocation using the process arguments and environment.
///
/// # Errors
///
/// See [`run_with`].
pub fn run() -> Result<i32, BootstrapError> {
    run_with(&SystemConfigLoader)
}

/// Loads configuration through `loader`, installs telemetry and runs one
/// reconciliation pass, returning the exit code it produced.
///
/// # Errors
///
/// Returns [`BootstrapError`] when any stage fails. Errors raised after
/// telemetry is installed are logged before being returned.
pub fn run_with(loader: &dyn ConfigLoader) -> Result<i32, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let outcome = config
        .monitor_settings()
        .map_err(|source| BootstrapError::Settings { source })
        .and_then(|settings| {
            reconcile::ensure(&settings, &config.supervisor_settings())
                .map_err(|source| BootstrapError::Reconcile { source })
        });
    if let Err(failure) = &outcome {
        error!(target: BOOTSTRAP_TARGET, error = %failure, "xrdservmon run failed");
    }
    outcome
}
