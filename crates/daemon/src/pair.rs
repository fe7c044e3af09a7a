// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The self-supervising pair.
//!
//! The supervisor always runs as two processes: the primary brings up the
//! user configuration, the backup only watches the primary, and each runs
//! a monitor worker whose supervised "process" is the other supervisor.
//! Either can therefore re-fork the other after a crash.

use std::path::Path;

use procmon_core::{Clock, ProcessSpec};
use procmon_lockfile::{LockError, LockHandle, LockRecord, LockStore, BACKUP_ID, PRIMARY_ID};

/// Which half of the pair this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Backup,
}

impl Role {
    /// Reserved lockfile id of this supervisor.
    pub fn own_id(&self) -> &'static str {
        match self {
            Role::Primary => PRIMARY_ID,
            Role::Backup => BACKUP_ID,
        }
    }

    /// Reserved lockfile id of the other supervisor.
    pub fn peer_id(&self) -> &'static str {
        match self {
            Role::Primary => BACKUP_ID,
            Role::Backup => PRIMARY_ID,
        }
    }

    /// Flag that starts the other supervisor in its role.
    fn peer_flag(&self) -> &'static str {
        match self {
            Role::Primary => "-f",
            Role::Backup => "-F",
        }
    }
}

procmon_core::simple_display! {
    Role {
        Primary => "primary",
        Backup => "backup",
    }
}

/// Build the monitor record for the peer supervisor: a monitored root that
/// re-execs this binary in the opposite role. Its lockfile is claimed by
/// the exec'd supervisor itself, never by the spawning side.
pub(crate) fn peer_spec(role: Role, config_path: &Path) -> std::io::Result<ProcessSpec> {
    let exe = std::env::current_exe()?;
    let mut spec = ProcessSpec::new(
        role.peer_id(),
        format!("{} {} {}", exe.display(), role.peer_flag(), config_path.display()),
    );
    spec.monitored = true;
    // Pace respawns so a sick peer cannot turn into a fork storm.
    spec.restart_delay_seconds = 1;
    Ok(spec)
}

/// Claim this supervisor's own lockfile, carrying the run count forward
/// from any surviving file so it stays cumulative across generations.
pub(crate) fn claim_own_lockfile<C: Clock>(
    store: &LockStore,
    role: Role,
    clock: &C,
    cmdline: &str,
) -> Result<LockHandle, LockError> {
    let run_count = match store.read_header(role.own_id()) {
        Ok(old) => old.run_count.saturating_add(1),
        Err(_) => 1,
    };
    let record = LockRecord::new(std::process::id(), run_count, clock.epoch_secs(), cmdline);
    store.create(role.own_id(), &record)
}

#[cfg(test)]
#[path = "pair_tests.rs"]
mod tests;
