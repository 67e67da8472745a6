//! Monitoring targets: the daemons a supervisor should report on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of locally running daemon the reconciler knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonRole {
    /// The xrootd data server.
    Xrootd,
    /// The cmsd cluster management daemon.
    Cmsd,
}

impl DaemonRole {
    /// Every role, in the order discovery visits them.
    pub const ALL: [Self; 2] = [Self::Cmsd, Self::Xrootd];

    /// Name the daemon reports in the process table; also its PID file stem.
    #[must_use]
    pub const fn process_name(self) -> &'static str {
        match self {
            Self::Xrootd => "xrootd",
            Self::Cmsd => "cmsd",
        }
    }

    /// File name of the role's PID file inside an instance directory.
    #[must_use]
    pub fn pid_file_name(self) -> String {
        format!("{}.pid", self.process_name())
    }
}

impl fmt::Display for DaemonRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.process_name())
    }
}

/// One locally running daemon selected for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Kind of daemon.
    pub role: DaemonRole,
    /// Instance name, taken from the PID file's parent directory.
    pub instance_label: String,
    /// Live process identifier.
    pub pid: u32,
}

impl Target {
    /// Builds a target.
    #[must_use]
    pub fn new(role: DaemonRole, instance_label: impl Into<String>, pid: u32) -> Self {
        Self {
            role,
            instance_label: instance_label.into(),
            pid,
        }
    }

    /// Label reported for this target: `{se_name}_{instance}_{role}`.
    #[must_use]
    pub fn composite_label(&self, se_name: &str) -> String {
        format!("{se_name}_{}_{}", self.instance_label, self.role)
    }
}

/// What should be monitored right now, keyed by PID.
///
/// Two sets are equal when they map the same PIDs to the same role and
/// label; that equality is the convergence predicate of reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSet {
    targets: BTreeMap<u32, Target>,
}

impl TargetSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a target, replacing any earlier entry for the same PID.
    pub fn insert(&mut self, target: Target) -> Option<Target> {
        self.targets.insert(target.pid, target)
    }

    /// Looks up the target recorded for `pid`.
    #[must_use]
    pub fn get(&self, pid: u32) -> Option<&Target> {
        self.targets.get(&pid)
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true when there is nothing to monitor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterates targets in ascending PID order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }
}

impl FromIterator<Target> for TargetSet {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        let mut set = Self::new();
        for target in iter {
            set.insert(target);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = &'a Target;
    type IntoIter = std::collections::btree_map::Values<'a, u32, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.values()
    }
}
