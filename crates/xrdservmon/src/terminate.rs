//! Stops supervisors that a replacement launch supersedes.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::info;

const TERMINATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::terminate");

/// Errors raised while signalling a supervisor.
#[derive(Debug, Error)]
pub enum TerminateError {
    /// The PID cannot be addressed as a single process.
    #[error("refusing to signal pid {pid}")]
    InvalidPid {
        /// Rejected PID.
        pid: u32,
    },
    /// Delivering the signal failed.
    #[error("failed to signal supervisor pid {pid}: {source}")]
    Signal {
        /// PID of the supervisor.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Asks a running supervisor to exit.
pub trait SupervisorTerminator {
    /// Requests termination of `pid`. A process that already exited counts
    /// as terminated.
    fn terminate(&self, pid: u32) -> Result<(), TerminateError>;
}

impl<T: SupervisorTerminator + ?Sized> SupervisorTerminator for &T {
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        (**self).terminate(pid)
    }
}

/// Terminator sending `SIGTERM`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTerminator;

impl SignalTerminator {
    /// Builds a new terminator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SupervisorTerminator for SignalTerminator {
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        // 0 and values beyond i32::MAX would address process groups.
        let raw = i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 0)
            .ok_or(TerminateError::InvalidPid { pid })?;
        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => {
                info!(target: TERMINATE_TARGET, pid, "sent SIGTERM to superseded monitor");
                Ok(())
            }
            Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(TerminateError::Signal { pid, source }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::Command;

    use rstest::rstest;

    use super::*;
    use crate::launcher::exit_code;

    #[test]
    fn terminates_running_process() {
        let mut child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("spawn sleep");

        SignalTerminator::new()
            .terminate(child.id())
            .expect("signal child");

        let status = child.wait().expect("wait for child");
        assert_eq!(exit_code(status), 128 + 15);
    }

    #[rstest]
    #[case(0)]
    #[case(u32::MAX)]
    fn rejects_group_addressing_pids(#[case] pid: u32) {
        let error = SignalTerminator::new()
            .terminate(pid)
            .expect_err("pid must be rejected");
        assert!(matches!(error, TerminateError::InvalidPid { .. }));
    }
}
