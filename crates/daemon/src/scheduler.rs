// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runnability scheduler: dependency-ordered bring-up.
//!
//! Repeated fixed-point passes over the table in configuration order
//! handle arbitrary DAG shapes without a topological sort. Configuration
//! order is the observable tie-break between independent roots.

use std::sync::Arc;
use std::time::Duration;

use procmon_core::{Clock, ProcIdx, ProcessState, ProcessTable};
use tracing::{info, trace, warn};

use crate::context::SupervisorCtx;
use crate::monitor;

/// How long to wait between passes while upstream processes settle.
const PASS_DELAY: Duration = Duration::from_millis(100);

/// A record may start iff every parent is running, it is not inert, and no
/// live worker already supervises it.
pub(crate) fn runnable(
    table: &ProcessTable,
    idx: ProcIdx,
    worker_alive: impl Fn(ProcIdx) -> bool,
) -> bool {
    let rec = table.get(idx);
    if rec.skip || worker_alive(idx) {
        return false;
    }
    rec.parents.iter().all(|&p| table.get(p).state == ProcessState::Running)
}

/// Dispatch every record whose preconditions hold, repeating passes until
/// all records have been handed to a worker.
///
/// Records trapped in a dependency cycle never become runnable, so
/// bring-up never terminates for them; the loop keeps polling and logs the
/// stall once.
pub async fn bring_up<C: Clock>(ctx: Arc<SupervisorCtx<C>>) {
    let total = ctx.table.lock().len();
    let mut dispatched = vec![false; total];
    let mut stall_logged = false;

    loop {
        let mut progress = false;
        for idx in 0..total {
            if dispatched[idx] {
                continue;
            }
            let (start, id) = {
                let table = ctx.table.lock();
                if table.get(idx).skip {
                    // Inert records take no worker and no further passes.
                    (None, String::new())
                } else {
                    (
                        Some(runnable(&table, idx, |i| ctx.worker_alive(i))),
                        table.get(idx).id.clone(),
                    )
                }
            };
            match start {
                None => dispatched[idx] = true,
                Some(true) => {
                    if monitor::start_worker(&ctx, idx) {
                        info!(id = %id, "dispatched");
                    }
                    dispatched[idx] = true;
                    progress = true;
                }
                Some(false) => {}
            }
        }

        if dispatched.iter().all(|&d| d) {
            info!("bring-up complete");
            return;
        }
        if !progress {
            if !stall_logged && no_pending_parent_can_settle(&ctx, &dispatched) {
                warn!("remaining processes are in a dependency cycle and will never start");
                stall_logged = true;
            }
            trace!("waiting for upstream processes to reach running");
            tokio::time::sleep(PASS_DELAY).await;
        }
    }
}

/// True when every undispatched record only waits on other undispatched
/// records, i.e. no in-flight bring-up can unblock it.
fn no_pending_parent_can_settle<C: Clock>(ctx: &SupervisorCtx<C>, dispatched: &[bool]) -> bool {
    let table = ctx.table.lock();
    (0..table.len()).filter(|&i| !dispatched[i]).all(|i| {
        table
            .get(i)
            .parents
            .iter()
            .any(|&p| !dispatched[p] && table.get(p).state != ProcessState::Running)
    })
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
