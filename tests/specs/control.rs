// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane specs: kill, start, restart, delete against real
//! lockfiles and a live stand-in process.

use crate::prelude::*;

const SUSPEND: u32 = 0xDEAD_BEEF;
const DELETE: u32 = 0xDEAF_BABE;

#[test]
fn kill_suspends_monitoring_and_kills_the_process() {
    let sandbox = Sandbox::new();
    let child = spawn_sleeper();
    let pid = child.id();
    sandbox.plant_lockfile("web", pid, 1, now_secs() - 500, "sleep 300");

    sandbox.procmon().args(["-k", "web"]).assert().success();

    let header = sandbox.store().read_header("web").unwrap();
    assert_eq!(header.terminate, SUSPEND);
    // start_time was reset to the moment of suspension
    assert!(now_secs() - header.start_time < 30);

    // The recorded pid stops existing once the zombie is reaped.
    reap(child);
    assert!(!procmon_lockfile::pid_alive(pid));
}

#[test]
fn start_clears_the_control_word() {
    let sandbox = Sandbox::new();
    sandbox.plant_lockfile("web", 0, 1, now_secs(), "sleep 300");
    sandbox.store().set_control("web", SUSPEND).unwrap();

    sandbox.procmon().args(["-s", "web"]).assert().success();
    assert_eq!(sandbox.store().read_header("web").unwrap().terminate, 0);
}

#[test]
fn restart_kills_the_recorded_pid_without_touching_the_control_word() {
    let sandbox = Sandbox::new();
    let child = spawn_sleeper();
    let pid = child.id();
    sandbox.plant_lockfile("web", pid, 3, now_secs(), "sleep 300");

    sandbox.procmon().args(["-r", "web"]).assert().success();

    let header = sandbox.store().read_header("web").unwrap();
    assert_eq!(header.terminate, 0);
    assert_eq!(header.run_count, 3);
    reap(child);
    assert!(!procmon_lockfile::pid_alive(pid));
}

#[test]
fn delete_flags_the_lockfile_for_removal() {
    let sandbox = Sandbox::new();
    let child = spawn_sleeper();
    let pid = child.id();
    sandbox.plant_lockfile("web", pid, 1, now_secs(), "sleep 300");

    sandbox.procmon().args(["-d", "web"]).assert().success();

    // With no worker running, the flagged lockfile stays behind; the
    // worker is what unlinks it.
    let header = sandbox.store().read_header("web").unwrap();
    assert_eq!(header.terminate, DELETE);
    reap(child);
}

#[test]
fn control_commands_on_unknown_ids_exit_with_enoent() {
    let sandbox = Sandbox::new();
    for flag in ["-k", "-s", "-r", "-d"] {
        let started = std::time::Instant::now();
        sandbox
            .procmon()
            .args([flag, "ghost"])
            .assert()
            .failure()
            .code(2)
            .stderr_has("no lockfile for 'ghost'");
        // Reported immediately: the retrying open would add 500ms alone.
        assert!(
            started.elapsed() < std::time::Duration::from_millis(300),
            "{flag} took {:?} against a missing lockfile",
            started.elapsed()
        );
    }
}

#[test]
fn kill_of_an_already_dead_process_still_succeeds() {
    let sandbox = Sandbox::new();
    // Stale record: nothing runs at this pid.
    sandbox.plant_lockfile("web", 999_999_999, 1, now_secs(), "sleep 300");
    sandbox.procmon().args(["-k", "web"]).assert().success();
    assert_eq!(sandbox.store().read_header("web").unwrap().terminate, SUSPEND);
}
