// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the CLI specs.

#![allow(dead_code)]

use std::process::{Child, Command as StdCommand, Stdio};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use assert_cmd::Command;
use procmon_lockfile::{LockRecord, LockStore};
use tempfile::TempDir;

/// An isolated lockfile directory plus a `procmon` invocation wired to it.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn store(&self) -> LockStore {
        LockStore::new(self.dir.path())
    }

    /// A `procmon` command scoped to this sandbox's lock directory.
    pub fn procmon(&self) -> Command {
        let mut cmd = Command::cargo_bin("procmon").expect("procmon binary");
        cmd.env("PROCMON_LOCK_DIR", self.dir.path());
        cmd
    }

    /// Drop a lockfile into the store as a dead process would leave it:
    /// record present, lock released.
    pub fn plant_lockfile(&self, id: &str, pid: u32, run_count: u32, start_time: u64, exec: &str) {
        let handle = self
            .store()
            .create(id, &LockRecord::new(pid, run_count, start_time, exec))
            .expect("plant lockfile");
        drop(handle);
    }

    /// Write a config file into the sandbox and return its path.
    pub fn config(&self, contents: &str) -> std::path::PathBuf {
        let path = self.dir.path().join("processes.json");
        std::fs::write(&path, contents).expect("write config");
        path
    }
}

/// Spawn a throwaway `sleep` child to stand in for a supervised process.
pub fn spawn_sleeper() -> Child {
    StdCommand::new("sleep")
        .arg("300")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn sleep")
}

/// Kill and reap a sleeper so its pid truly stops existing.
pub fn reap(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Poll until `check` passes or the timeout elapses.
pub fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Substring assertions on captured output, chainable like the rest of
/// `assert_cmd`.
pub trait AssertExt: Sized {
    fn stdout_has(self, needle: &str) -> Self;
    fn stderr_has(self, needle: &str) -> Self;
    fn stdout_text(&self) -> String;
}

impl AssertExt for assert_cmd::assert::Assert {
    fn stdout_has(self, needle: &str) -> Self {
        let text = String::from_utf8_lossy(&self.get_output().stdout).into_owned();
        assert!(text.contains(needle), "stdout missing {needle:?}:\n{text}");
        self
    }

    fn stderr_has(self, needle: &str) -> Self {
        let text = String::from_utf8_lossy(&self.get_output().stderr).into_owned();
        assert!(text.contains(needle), "stderr missing {needle:?}:\n{text}");
        self
    }

    fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.get_output().stdout).into_owned()
    }
}
