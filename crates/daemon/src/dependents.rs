// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependent-restart policy.
//!
//! When a parent respawns and settles, its children are conditionally
//! restarted one level deep; grandchildren cascade transitively when the
//! child's own death is observed in turn. The whole pass is best-effort:
//! failures are logged and never propagated.

use std::sync::Arc;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use procmon_core::{Clock, ProcIdx, ProcessState};
use procmon_lockfile::pid_alive;
use tracing::{debug, warn};

use crate::context::SupervisorCtx;
use crate::monitor;

/// How one child reacts to its parent's restart.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DependentAction {
    /// Opted out, inert, or never brought up.
    Ignore,
    /// Monitored: SIGKILL the recorded pid; its own worker restarts it.
    KillPid,
    /// Unmonitored: its previous worker has exited, so create a new one.
    FreshWorker,
}

pub(crate) fn plan(
    restart_on_parent_death: bool,
    skip: bool,
    state: ProcessState,
    monitored: bool,
) -> DependentAction {
    if !restart_on_parent_death || skip || state == ProcessState::Init {
        DependentAction::Ignore
    } else if monitored {
        DependentAction::KillPid
    } else {
        DependentAction::FreshWorker
    }
}

/// Walk the children of `parent` and restart those that asked for it,
/// propagating the parent's settle time into each child's restart delay.
pub(crate) async fn restart_dependents<C: Clock>(ctx: &Arc<SupervisorCtx<C>>, parent: ProcIdx) {
    let (children, parent_wait, parent_id) = {
        let table = ctx.table.lock();
        let rec = table.get(parent);
        (rec.children.clone(), rec.wait_seconds, rec.id.clone())
    };

    for child_idx in children {
        let (action, child_id) = {
            let mut table = ctx.table.lock();
            let rec = table.get_mut(child_idx);
            let action = plan(rec.restart_on_parent_death, rec.skip, rec.state, rec.monitored);
            if action != DependentAction::Ignore {
                rec.restart_delay_seconds = parent_wait;
            }
            (action, rec.id.clone())
        };

        match action {
            DependentAction::Ignore => {}
            DependentAction::KillPid => match ctx.store.read_header(&child_id) {
                Ok(h) if pid_alive(h.pid) => {
                    debug!(parent = %parent_id, child = %child_id, pid = h.pid, "restarting dependent");
                    if let Err(e) = kill(Pid::from_raw(h.pid as i32), Signal::SIGKILL) {
                        warn!(child = %child_id, error = %e, "dependent restart kill failed");
                    }
                }
                Ok(_) => debug!(child = %child_id, "dependent not running, nothing to restart"),
                Err(e) => warn!(child = %child_id, error = %e, "dependent restart skipped"),
            },
            DependentAction::FreshWorker => {
                if monitor::start_worker(ctx, child_idx) {
                    debug!(parent = %parent_id, child = %child_id, "fresh worker for dependent");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "dependents_tests.rs"]
mod tests;
