// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations behind the `procmon` flags.

pub mod control;
pub mod list;
pub mod shutdown;

use std::path::Path;

use procmon_daemon::Role;

use crate::exit_error::ExitError;

/// Run the supervisor daemon until it is told to die.
pub async fn daemon(role: Role, config: &Path) -> Result<(), ExitError> {
    procmon_daemon::run(role, config)
        .await
        .map_err(|e| ExitError::new(1, e.to_string()))
}
