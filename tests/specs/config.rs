// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration error specs: bad configurations abort daemon startup.

use crate::prelude::*;

#[test]
fn missing_config_file_fails_startup() {
    let sandbox = Sandbox::new();
    sandbox
        .procmon()
        .args(["-F", "/nonexistent/processes.json"])
        .assert()
        .failure()
        .stderr_has("failed to read");
}

#[test]
fn malformed_json_fails_startup() {
    let sandbox = Sandbox::new();
    let config = sandbox.config("{not json");
    sandbox
        .procmon()
        .arg("-F")
        .arg(&config)
        .assert()
        .failure()
        .stderr_has("invalid configuration");
}

#[test]
fn unresolved_dependency_aborts_startup() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(
        r#"{"processes": [{"id": "web", "exec": "/bin/web", "depends": ["ghost"]}]}"#,
    );
    sandbox
        .procmon()
        .arg("-F")
        .arg(&config)
        .assert()
        .failure()
        .stderr_has("unknown id 'ghost'");
}

#[test]
fn duplicate_id_aborts_startup() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(
        r#"{"processes": [
            {"id": "web", "exec": "/bin/web"},
            {"id": "web", "exec": "/bin/web2"}
        ]}"#,
    );
    sandbox
        .procmon()
        .arg("-F")
        .arg(&config)
        .assert()
        .failure()
        .stderr_has("duplicate process id");
}

#[test]
fn backup_role_validates_the_config_too() {
    let sandbox = Sandbox::new();
    let config = sandbox.config("{not json");
    sandbox.procmon().arg("-f").arg(&config).assert().failure();
}
