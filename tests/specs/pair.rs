// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-supervisor pair specs: the primary forks a backup, and the backup
//! re-forks a dead primary.

use crate::prelude::*;
use serial_test::serial;
use std::process::{Command as StdCommand, Stdio};
use std::time::Duration;

/// Kills whatever half of the pair is still alive if a test panics
/// mid-flight; otherwise the pair would keep respawning each other
/// against the sandbox forever.
struct PairGuard {
    lock_dir: std::path::PathBuf,
    primary: Option<std::process::Child>,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        let _ = StdCommand::new(assert_cmd::cargo::cargo_bin("procmon"))
            .env("PROCMON_LOCK_DIR", &self.lock_dir)
            .arg("-x")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Some(mut child) = self.primary.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn supervisor_up(sandbox: &Sandbox, id: &str) -> Option<u32> {
    sandbox
        .store()
        .read_header(id)
        .ok()
        .filter(|h| procmon_lockfile::pid_alive(h.pid))
        .map(|h| h.pid)
}

#[test]
#[serial]
fn primary_forks_backup_and_backup_recovers_a_dead_primary() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(r#"{"processes": []}"#);

    let primary = StdCommand::new(assert_cmd::cargo::cargo_bin("procmon"))
        .env("PROCMON_LOCK_DIR", sandbox.path())
        .arg("-F")
        .arg(&config)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn primary");
    let mut guard = PairGuard { lock_dir: sandbox.path().to_path_buf(), primary: Some(primary) };

    // Both halves come up, each holding its own lockfile.
    assert!(
        eventually(Duration::from_secs(15), || {
            supervisor_up(&sandbox, "procmon1").is_some()
                && supervisor_up(&sandbox, "procmon2").is_some()
        }),
        "pair did not come up"
    );
    let pid1 = supervisor_up(&sandbox, "procmon1").unwrap();
    let backup_pid = supervisor_up(&sandbox, "procmon2").unwrap();

    // Kill the primary; reap it so the pid really disappears.
    if let Some(mut child) = guard.primary.take() {
        assert_eq!(child.id(), pid1);
        child.kill().expect("kill primary");
        let _ = child.wait();
    }

    // The backup re-forks a primary; both lockfiles are present and live
    // again, and the new primary is a different process.
    assert!(
        eventually(Duration::from_secs(20), || {
            supervisor_up(&sandbox, "procmon1").is_some_and(|pid| pid != pid1)
        }),
        "backup did not recover the primary"
    );
    assert_eq!(supervisor_up(&sandbox, "procmon2"), Some(backup_pid));

    let header = sandbox.store().read_header("procmon1").unwrap();
    assert!(header.run_count >= 2, "recovered primary should carry the run count forward");
    assert!(header.exec.contains("-F"));

    // Tear the pair down; the shutdown sequence unlinks both lockfiles.
    sandbox.procmon().arg("-x").assert().success();
    assert!(
        eventually(Duration::from_secs(10), || {
            !sandbox.store().exists("procmon1") && !sandbox.store().exists("procmon2")
        }),
        "shutdown left supervisor lockfiles behind"
    );
}
