// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage output specs.

use crate::prelude::*;

#[test]
fn dash_h_prints_usage_to_stderr_and_exits_zero() {
    Sandbox::new()
        .procmon()
        .arg("-h")
        .assert()
        .success()
        .stderr_has("Usage")
        .stderr_has("-F")
        .stderr_has("-l");
}

#[test]
fn no_arguments_prints_usage() {
    Sandbox::new().procmon().assert().success().stderr_has("Usage");
}
