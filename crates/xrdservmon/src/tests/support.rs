//! Test doubles and filesystem fixtures shared by the unit and behavioural
//! suites.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::PathBuf;

use tempfile::TempDir;
use xrdservmon_config::{BOOKKEEPING_PREFIX, MonitorSettings, SupervisorSettings};

use crate::discovery::TargetDiscovery;
use crate::launcher::{LaunchError, LaunchRequest, SupervisorHandle, SupervisorLauncher};
use crate::probe::ProcfsProbe;
use crate::reconcile::{ReconcileEngine, ReconcileError};
use crate::state::{JsonStateStore, StateStore, SupervisorRecord};
use crate::target::{DaemonRole, TargetSet};
use crate::terminate::{SupervisorTerminator, TerminateError};

/// Temporary PID tree, run directory and fake procfs.
pub(crate) struct RunLayout {
    _root: TempDir,
    pub(crate) pid_base: PathBuf,
    pub(crate) run_path: PathBuf,
    pub(crate) procfs: PathBuf,
}

impl RunLayout {
    pub(crate) fn new() -> Self {
        let root = TempDir::new().expect("temporary layout root");
        let pid_base = root.path().join("pids");
        let run_path = root.path().join("run");
        let procfs = root.path().join("proc");
        for dir in [&pid_base, &run_path, &procfs] {
            fs::create_dir_all(dir).expect("layout directory");
        }
        Self {
            _root: root,
            pid_base,
            run_path,
            procfs,
        }
    }

    pub(crate) fn settings(&self, se_name: &str) -> MonitorSettings {
        MonitorSettings {
            pid_path_base: self.pid_base.clone(),
            target_port: 1094,
            se_name: se_name.to_owned(),
            report_to: String::from("localhost"),
            run_path: self.run_path.clone(),
        }
    }

    /// Writes `{pid_base}/{instance}/{role}.pid`.
    pub(crate) fn pid_file(&self, instance: &str, role: DaemonRole, pid: u32) {
        let directory = self.pid_base.join(instance);
        fs::create_dir_all(&directory).expect("instance directory");
        fs::write(directory.join(role.pid_file_name()), format!("{pid}\n")).expect("pid file");
    }

    /// Writes a supervisor bookkeeping file under the run path.
    pub(crate) fn bookkeeping(&self, name: &str, pid: u32) {
        fs::write(self.run_path.join(name), pid.to_string()).expect("bookkeeping file");
    }

    /// Registers `pid` as a live process named `name` in the fake procfs.
    pub(crate) fn process(&self, pid: u32, name: &str) {
        let directory = self.procfs.join(pid.to_string());
        fs::create_dir_all(&directory).expect("procfs entry");
        fs::write(directory.join("comm"), format!("{name}\n")).expect("comm file");
    }

    pub(crate) fn probe(&self) -> ProcfsProbe {
        ProcfsProbe::with_root(&self.procfs)
    }
}

pub(crate) fn supervisor_settings() -> SupervisorSettings {
    SupervisorSettings {
        command: PathBuf::from("servMon.sh"),
        process_name: String::from("perl"),
        terminate_superseded: true,
    }
}

#[derive(Debug, Clone, Copy)]
enum LaunchOutcome {
    Exit { pid: u32, code: i32 },
    SpawnFailure,
}

/// Launcher recording requests and returning canned supervisors.
#[derive(Debug)]
pub(crate) struct RecordingLauncher {
    outcome: LaunchOutcome,
    requests: RefCell<Vec<LaunchRequest>>,
}

impl RecordingLauncher {
    /// Supervisors report `pid` and exit with `code` when awaited.
    pub(crate) fn exiting_with(pid: u32, code: i32) -> Self {
        Self {
            outcome: LaunchOutcome::Exit { pid, code },
            requests: RefCell::default(),
        }
    }

    /// Every launch fails as if the executable were missing.
    pub(crate) fn failing() -> Self {
        Self {
            outcome: LaunchOutcome::SpawnFailure,
            requests: RefCell::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.borrow().clone()
    }
}

impl SupervisorLauncher for RecordingLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn SupervisorHandle>, LaunchError> {
        self.requests.borrow_mut().push(request.clone());
        match self.outcome {
            LaunchOutcome::Exit { pid, code } => Ok(Box::new(CannedHandle { pid, code })),
            LaunchOutcome::SpawnFailure => Err(LaunchError::Spawn {
                command: request.command.clone(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }
}

struct CannedHandle {
    pid: u32,
    code: i32,
}

impl SupervisorHandle for CannedHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn wait(&mut self) -> Result<i32, LaunchError> {
        Ok(self.code)
    }
}

/// Terminator recording the PIDs it was asked to stop.
#[derive(Debug, Default)]
pub(crate) struct RecordingTerminator {
    terminated: RefCell<Vec<u32>>,
}

impl RecordingTerminator {
    pub(crate) fn terminated(&self) -> Vec<u32> {
        self.terminated.borrow().clone()
    }
}

impl SupervisorTerminator for RecordingTerminator {
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        self.terminated.borrow_mut().push(pid);
        Ok(())
    }
}

/// Scenario world for the reconciliation behaviour suite.
///
/// Uses the real procfs probe and JSON state store over a [`RunLayout`], so
/// only the supervisor process itself is simulated.
pub(crate) struct ReconcileWorld {
    pub(crate) layout: RunLayout,
    pub(crate) se_name: String,
    pub(crate) launcher: RecordingLauncher,
    pub(crate) terminator: RecordingTerminator,
    pub(crate) outcome: Option<Result<i32, ReconcileError>>,
}

impl ReconcileWorld {
    /// PID reported by every supervisor launched in a scenario.
    pub(crate) const LAUNCHED_PID: u32 = 4242;

    fn new() -> Self {
        Self {
            layout: RunLayout::new(),
            se_name: String::from("SE"),
            launcher: RecordingLauncher::exiting_with(Self::LAUNCHED_PID, 0),
            terminator: RecordingTerminator::default(),
            outcome: None,
        }
    }

    /// Registers a supervisor at `pid` recorded as monitoring `targets`.
    pub(crate) fn running_monitor(&self, pid: u32, targets: &TargetSet) {
        self.layout.process(pid, "perl");
        self.layout.bookkeeping(BOOKKEEPING_PREFIX, pid);
        let record = SupervisorRecord {
            pid,
            targets: targets.clone(),
        };
        JsonStateStore::with_writer("xrdservmon")
            .save(&self.layout.run_path, &record)
            .expect("seed supervisor state");
    }

    /// Targets discovery currently reports for the layout.
    pub(crate) fn discovered(&self) -> TargetSet {
        TargetDiscovery::new(self.layout.probe()).discover(&self.layout.pid_base)
    }

    pub(crate) fn persisted(&self) -> TargetSet {
        JsonStateStore::with_writer("xrdservmon").load(&self.layout.run_path)
    }

    pub(crate) fn run(&mut self) {
        let engine = ReconcileEngine::new(
            self.layout.probe(),
            JsonStateStore::with_writer("xrdservmon"),
            &self.launcher,
            &self.terminator,
            supervisor_settings(),
        );
        self.outcome = Some(engine.ensure(&self.layout.settings(&self.se_name)));
    }

    /// Flattened `label pid` arguments of every launch.
    pub(crate) fn launched(&self) -> Vec<String> {
        self.launcher
            .requests()
            .iter()
            .map(|request| {
                request
                    .processes
                    .iter()
                    .map(|process| format!("{} {}", process.label, process.pid))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

pub(crate) fn world() -> RefCell<ReconcileWorld> {
    RefCell::new(ReconcileWorld::new())
}
