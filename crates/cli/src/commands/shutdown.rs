// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown-all: delete every monitored process, then both supervisors.
//!
//! User processes go first so the primary cannot restart anything while it
//! is itself being torn down. The supervisors' own lockfiles are unlinked
//! explicitly at the end; their workers are dead by then and cannot do it
//! themselves.

use std::time::Duration;

use procmon_lockfile::{is_supervisor_id, LockStore, BACKUP_ID, PRIMARY_ID};
use tracing::debug;

use super::control;
use crate::exit_error::ExitError;

pub async fn run(store: &LockStore) -> Result<(), ExitError> {
    let ids = store.scan()?;

    for id in ids.iter().filter(|id| !is_supervisor_id(id)) {
        if let Err(e) = control::delete(store, id) {
            debug!(id = %id, error = %e, "shutdown delete failed");
        }
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    for id in [PRIMARY_ID, BACKUP_ID] {
        if store.exists(id) {
            if let Err(e) = control::delete(store, id) {
                debug!(id = %id, error = %e, "supervisor shutdown delete failed");
            }
        }
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    for id in [PRIMARY_ID, BACKUP_ID] {
        if store.exists(id) {
            if let Err(e) = store.delete(id) {
                debug!(id = %id, error = %e, "supervisor lockfile unlink failed");
            }
        }
    }

    println!("shutdown complete");
    Ok(())
}
