// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listing specs: plain and JSON output over real lockfiles.

use crate::prelude::*;
use procmon_core::format_elapsed;

#[test]
fn empty_store_lists_just_the_header() {
    let out = Sandbox::new().procmon().arg("-l").assert().success().stdout_text();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    for column in ["Process Name", "pid", "Restarts", "Since", "Status", "Command"] {
        assert!(lines[0].contains(column), "missing column {column}");
    }
}

#[test]
fn plain_listing_shows_running_and_stopped_processes() {
    let sandbox = Sandbox::new();
    let child = spawn_sleeper();
    let child_id = child.id();
    sandbox.plant_lockfile("live", child_id, 2, now_secs() - 37, "sleep 300");
    sandbox.plant_lockfile("stale", 999_999_999, 5, now_secs() - 62, "/bin/gone");

    let out = sandbox.procmon().arg("-l").assert().success().stdout_text();
    reap(child);

    let live_line = out.lines().find(|l| l.starts_with("live")).expect("live row");
    assert!(live_line.contains("running"));
    assert!(live_line.contains("sleep 300"));
    assert!(live_line.contains(&child_id.to_string()));

    let stale_line = out.lines().find(|l| l.starts_with("stale")).expect("stale row");
    assert!(stale_line.contains("stopped"));
    assert!(stale_line.contains("/bin/gone"));
    assert!(stale_line.contains('5'));
}

#[test]
fn json_listing_carries_the_full_record() {
    let sandbox = Sandbox::new();
    let start = now_secs() - 3 * 86_400 - 12 * 3600 - 45 * 60 - 37;
    sandbox.plant_lockfile("web", 999_999_999, 4, start, "/bin/web -p 80");

    let out = sandbox.procmon().args(["-o", "json"]).assert().success().stdout_text();
    let parsed: serde_json::Value = serde_json::from_str(&out).expect("valid json");
    let rows = parsed.as_array().expect("array");
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    assert_eq!(row["name"], "web");
    assert_eq!(row["pid"], 999_999_999);
    assert_eq!(row["runcount"], 4);
    assert_eq!(row["state"], "stopped");
    assert_eq!(row["exec"], "/bin/web -p 80");

    // One second of slack between planting and listing.
    let since = row["since"].as_str().expect("since string");
    let elapsed = now_secs() - start;
    assert!(
        (elapsed.saturating_sub(2)..=elapsed).any(|s| format_elapsed(s) == since),
        "unexpected since {since:?}"
    );
    assert!(since.starts_with("3d12h45m"));
}

#[test]
fn supervisors_are_listed_first() {
    let sandbox = Sandbox::new();
    sandbox.plant_lockfile("aardvark", 1, 1, now_secs(), "/bin/a");
    sandbox.plant_lockfile("procmon1", 2, 1, now_secs(), "procmon -F cfg");
    sandbox.plant_lockfile("procmon2", 3, 1, now_secs(), "procmon -f cfg");

    let out = sandbox.procmon().arg("-l").assert().success().stdout_text();
    let names: Vec<&str> =
        out.lines().skip(1).map(|l| l.split_whitespace().next().unwrap_or("")).collect();
    assert_eq!(names, vec!["procmon1", "procmon2", "aardvark"]);
}

#[test]
fn plain_format_by_name_matches_dash_l() {
    let sandbox = Sandbox::new();
    // start_time ahead of the clock pins `since` at 0s for both runs
    sandbox.plant_lockfile("web", 999_999_999, 1, now_secs() + 1_000, "/bin/web");

    let dash_l = sandbox.procmon().arg("-l").assert().success().stdout_text();
    let dash_o = sandbox.procmon().args(["-o", "plain"]).assert().success().stdout_text();
    assert_eq!(dash_l, dash_o);
}

#[test]
fn corrupt_lockfile_is_skipped_with_a_warning() {
    let sandbox = Sandbox::new();
    sandbox.plant_lockfile("good", 999_999_999, 1, now_secs(), "/bin/good");
    std::fs::write(sandbox.store().path("torn"), [0u8; 5]).unwrap();

    sandbox
        .procmon()
        .arg("-l")
        .assert()
        .success()
        .stdout_has("good")
        .stderr_has("skipping torn");
}
