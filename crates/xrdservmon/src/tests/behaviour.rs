//! Behavioural tests for whole reconciliation passes.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::target::{DaemonRole, Target, TargetSet};

use super::support::{self, ReconcileWorld};

#[fixture]
fn world() -> RefCell<ReconcileWorld> {
    support::world()
}

#[given("the storage element \"{se_name}\"")]
fn given_storage_element(world: &RefCell<ReconcileWorld>, se_name: String) {
    world.borrow_mut().se_name = se_name;
}

#[given("a live {role} daemon {pid} for instance \"{instance}\"")]
fn given_live_daemon(
    world: &RefCell<ReconcileWorld>,
    role: String,
    pid: u32,
    instance: String,
) -> Result<(), String> {
    let role = parse_role(&role)?;
    let world = world.borrow();
    world.layout.pid_file(&instance, role, pid);
    world.layout.process(pid, role.process_name());
    Ok(())
}

#[given("a {role} PID file for instance \"{instance}\" naming process {pid} called {name}")]
fn given_misnamed_daemon(
    world: &RefCell<ReconcileWorld>,
    role: String,
    instance: String,
    pid: u32,
    name: String,
) -> Result<(), String> {
    let role = parse_role(&role)?;
    let world = world.borrow();
    world.layout.pid_file(&instance, role, pid);
    world.layout.process(pid, &name);
    Ok(())
}

#[given("monitor {pid} is running for the current daemons")]
fn given_current_monitor(world: &RefCell<ReconcileWorld>, pid: u32) {
    let world = world.borrow();
    let targets = world.discovered();
    world.running_monitor(pid, &targets);
}

#[given("monitor {pid} is running for an earlier xrootd daemon {old_pid}")]
fn given_outdated_monitor(world: &RefCell<ReconcileWorld>, pid: u32, old_pid: u32) {
    let targets: TargetSet = [Target::new(DaemonRole::Xrootd, "foo", old_pid)]
        .into_iter()
        .collect();
    world.borrow().running_monitor(pid, &targets);
}

#[when("the reconciler runs")]
fn when_reconciler_runs(world: &RefCell<ReconcileWorld>) {
    world.borrow_mut().run();
}

#[then("the run exits with code {code}")]
fn then_exit_code(world: &RefCell<ReconcileWorld>, code: i32) -> Result<(), String> {
    match world.borrow().outcome.as_ref() {
        Some(Ok(actual)) if *actual == code => Ok(()),
        other => Err(format!("expected exit code {code}, got {other:?}")),
    }
}

#[then("a monitor was launched for \"{arguments}\"")]
fn then_monitor_launched(world: &RefCell<ReconcileWorld>, arguments: String) {
    assert_eq!(world.borrow().launched(), vec![arguments]);
}

#[then("no monitor was launched")]
fn then_no_monitor(world: &RefCell<ReconcileWorld>) {
    let launched = world.borrow().launched();
    assert!(launched.is_empty(), "unexpected launches: {launched:?}");
}

#[then("the launched monitor's targets are persisted")]
fn then_state_persisted(world: &RefCell<ReconcileWorld>) {
    let world = world.borrow();
    assert_eq!(world.persisted(), world.discovered());
    let raw = std::fs::read_to_string(world.layout.run_path.join("xrdservmon_state.json"))
        .expect("state file");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("state is JSON");
    assert_eq!(value["pid"], ReconcileWorld::LAUNCHED_PID);
}

#[then("monitor {pid} was asked to stop")]
fn then_monitor_stopped(world: &RefCell<ReconcileWorld>, pid: u32) {
    assert_eq!(world.borrow().terminator.terminated(), vec![pid]);
}

#[then("no monitor was asked to stop")]
fn then_nothing_stopped(world: &RefCell<ReconcileWorld>) {
    assert!(world.borrow().terminator.terminated().is_empty());
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "First run launches a monitor for the live daemons"
)]
fn first_run_launches_monitor(world: RefCell<ReconcileWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "A correctly configured monitor is left alone"
)]
fn matching_monitor_left_alone(world: RefCell<ReconcileWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "Nothing to monitor"
)]
fn nothing_to_monitor(world: RefCell<ReconcileWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "A daemon whose process name does not match is excluded"
)]
fn misnamed_daemon_excluded(world: RefCell<ReconcileWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "An outdated monitor is replaced"
)]
fn outdated_monitor_replaced(world: RefCell<ReconcileWorld>) {
    let _ = world;
}

fn parse_role(name: &str) -> Result<DaemonRole, String> {
    DaemonRole::ALL
        .into_iter()
        .find(|role| role.process_name() == name)
        .ok_or_else(|| format!("unknown daemon role '{name}'"))
}
