// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup sequencing and the termination handler.

use std::path::Path;
use std::sync::Arc;

use procmon_core::{load_config, ConfigError, GraphError, ProcessTable, SystemClock};
use procmon_lockfile::{LockError, LockStore};
use thiserror::Error;
use tracing::{error, info};

use crate::context::SupervisorCtx;
use crate::pair::{self, Role};
use crate::scheduler;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("failed to claim supervisor lockfile ({role}): {source}")]
    Claim {
        role: Role,
        #[source]
        source: LockError,
    },

    #[error("could not locate current executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("signal handler setup failed: {0}")]
    Signals(#[source] std::io::Error),
}

/// Run the supervisor daemon in the given role until a termination signal.
///
/// Both roles validate the configuration and watch their peer; only the
/// primary brings up the user processes.
pub async fn run(role: Role, config_path: &Path) -> Result<(), SupervisorError> {
    let store = LockStore::from_env();
    let user_specs = load_config(config_path)?;

    // 1. Peer record first: it is the earliest root in configuration
    // order, so the other supervisor comes up before any user process.
    let mut specs = vec![pair::peer_spec(role, config_path).map_err(SupervisorError::CurrentExe)?];
    if role == Role::Primary {
        specs.extend(user_specs);
    }
    let table = ProcessTable::build(&specs)?;

    // 2. Claim our own lockfile and hold its lock for the process
    // lifetime; a second supervisor in the same role fails here.
    let clock = SystemClock;
    let cmdline = std::env::args().collect::<Vec<_>>().join(" ");
    let own_lock = pair::claim_own_lockfile(&store, role, &clock, &cmdline)
        .map_err(|source| SupervisorError::Claim { role, source })?;
    info!(role = %role, pid = std::process::id(), procs = table.len() - 1, "supervisor started");

    // 3. Dispatch workers; the peer worker is just the first record.
    let ctx = Arc::new(SupervisorCtx::new(table, store, clock));
    tokio::spawn(scheduler::bring_up(Arc::clone(&ctx)));

    // 4. All forward progress now happens in workers; park until told to
    // die. The backup re-forks us after the exit.
    wait_for_termination().await?;
    error!(role = %role, "termination signal received, exiting");
    drop(own_lock);
    std::process::exit(1);
}

async fn wait_for_termination() -> Result<(), SupervisorError> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).map_err(SupervisorError::Signals)?;
    let mut int = signal(SignalKind::interrupt()).map_err(SupervisorError::Signals)?;
    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
    }
    Ok(())
}
