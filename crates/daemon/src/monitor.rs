// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process monitor worker.
//!
//! One tokio task owns each supervised record's lifecycle: it observes the
//! control word, blocks on the lockfile for death detection, applies the
//! restart policy, and performs the spawn. Worker failures stay inside the
//! worker; nothing propagates to siblings or the scheduler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use procmon_core::{Clock, ProcIdx, ProcessState};
use procmon_lockfile::{
    is_supervisor_id, pid_alive, LockError, CONTROL_DELETE, CONTROL_SUSPEND,
};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::context::SupervisorCtx;
use crate::{dependents, spawn};

/// Re-check interval while the control word reads suspended.
const SUSPEND_POLL: Duration = Duration::from_secs(1);
/// Pid poll interval after the kernel refuses the blocking acquire.
const DEADLOCK_POLL: Duration = Duration::from_secs(1);
/// Post-spawn settle window before dependents are kicked.
const SETTLE: Duration = Duration::from_millis(500);

/// Start a monitor worker for `idx` unless one is already alive.
pub(crate) fn start_worker<C: Clock>(ctx: &Arc<SupervisorCtx<C>>, idx: ProcIdx) -> bool {
    let worker = Arc::clone(ctx);
    ctx.claim_worker_slot(idx, move || {
        // Boxed: the worker indirectly recurses through the
        // dependent-restart path (fresh workers for unmonitored children).
        let fut: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(run_worker(worker, idx));
        tokio::spawn(fut)
    })
}

/// What to do once a death has been observed.
#[derive(Debug, PartialEq, Eq)]
enum DeathAction {
    /// Unmonitored process that has run its generation: the worker exits.
    ExitGeneration,
    /// Sleep the delay, then respawn.
    Restart { delay_seconds: u64 },
}

fn death_action(
    monitored: bool,
    run_count: u32,
    max_parent_runs: u32,
    restart_delay_seconds: u64,
) -> DeathAction {
    if !monitored && run_count >= max_parent_runs {
        DeathAction::ExitGeneration
    } else {
        DeathAction::Restart { delay_seconds: restart_delay_seconds }
    }
}

enum WaitOutcome {
    Dead,
    Deadlock,
    Failed,
}

async fn run_worker<C: Clock>(ctx: Arc<SupervisorCtx<C>>, idx: ProcIdx) {
    let id = ctx.table.lock().get(idx).id.clone();
    let mut child: Option<Child> = None;
    info!(id = %id, "monitor worker started");

    loop {
        let header = match ctx.store.read_header(&id) {
            Ok(h) => Some(h),
            Err(LockError::NotFound(_)) => None,
            Err(e) => {
                warn!(id = %id, error = %e, "lockfile unreadable");
                None
            }
        };

        if let Some(h) = &header {
            match h.terminate {
                CONTROL_DELETE => {
                    if let Err(e) = ctx.store.delete(&id) {
                        warn!(id = %id, error = %e, "lockfile delete failed");
                    }
                    set_state(&ctx, idx, ProcessState::Terminated);
                    info!(id = %id, "monitoring deleted, worker exiting");
                    return;
                }
                CONTROL_SUSPEND => {
                    tokio::time::sleep(SUSPEND_POLL).await;
                    continue;
                }
                _ => {}
            }

            if pid_alive(h.pid) {
                set_state(&ctx, idx, ProcessState::Running);
                match wait_for_death(&ctx, &id).await {
                    WaitOutcome::Dead => {}
                    WaitOutcome::Deadlock => {
                        // Mutual supervisor monitoring; drop to pid polling.
                        debug!(id = %id, pid = h.pid, "lock wait would deadlock, polling");
                        poll_until_dead(h.pid, &mut child).await;
                    }
                    WaitOutcome::Failed => {
                        set_state(&ctx, idx, ProcessState::Terminated);
                        return;
                    }
                }
                reap(&mut child).await;
                debug!(id = %id, pid = h.pid, "death observed");
                continue;
            }
        }

        // Not running: either never spawned, or its death was just observed
        // (a stale lockfile with a dead pid lands here too, the normal path
        // after a supervisor crash-recovery restart).
        let action = {
            let table = ctx.table.lock();
            let rec = table.get(idx);
            if rec.run_count == 0 {
                DeathAction::Restart { delay_seconds: 0 }
            } else {
                let max_parent_runs =
                    rec.parents.iter().map(|&p| table.get(p).run_count).max().unwrap_or(0);
                death_action(
                    rec.monitored,
                    rec.run_count,
                    max_parent_runs,
                    rec.restart_delay_seconds,
                )
            }
        };
        match action {
            DeathAction::ExitGeneration => {
                // State is left where bring-up put it; Terminated is
                // reserved for shutdown and delete.
                info!(id = %id, "generation complete, worker exiting");
                return;
            }
            DeathAction::Restart { delay_seconds } => {
                if delay_seconds > 0 {
                    tokio::time::sleep(Duration::from_secs(delay_seconds)).await;
                }
            }
        }

        let (exec, run_count, wait_seconds) = {
            let mut table = ctx.table.lock();
            let rec = table.get_mut(idx);
            let run_count = rec.bump_run_count();
            rec.state = ProcessState::Started;
            (rec.exec.clone(), run_count, rec.wait_seconds)
        };
        let now = ctx.clock.epoch_secs();
        let own_lockfile = !is_supervisor_id(&id);

        match spawn::spawn_child(&ctx.store, &id, &exec, run_count, now, own_lockfile) {
            Ok(c) => {
                let pid = c.id().unwrap_or_default();
                child = Some(c);
                info!(id = %id, pid, run_count, "spawned");

                if own_lockfile {
                    update_header(&ctx, &id, pid, run_count, now).await;
                } else {
                    // Supervisor peer: it claims its own lockfile during
                    // startup. Rendezvous on the file so the next loop pass
                    // cannot mistake a slow startup for a death.
                    let store = ctx.store.clone();
                    let id_owned = id.clone();
                    let _ = tokio::task::spawn_blocking(move || store.open(&id_owned)).await;
                }

                if wait_seconds > 0 {
                    set_state(&ctx, idx, ProcessState::Waiting);
                    tokio::time::sleep(Duration::from_secs(wait_seconds)).await;
                }
                set_state(&ctx, idx, ProcessState::Running);

                tokio::time::sleep(SETTLE).await;
                dependents::restart_dependents(&ctx, idx).await;
            }
            Err(e) => {
                // run_count already counts the attempt; the next loop
                // iteration sleeps the restart delay and retries.
                warn!(id = %id, error = %e, "spawn failed");
            }
        }
    }
}

/// Block until the lockfile's byte-0 lock can be taken, i.e. until the
/// holder dies.
///
/// The acquire has no timeout, so it runs on a detached thread rather
/// than the blocking pool: runtime shutdown must not wait behind a lock
/// held by a process that may never die.
async fn wait_for_death<C: Clock>(ctx: &SupervisorCtx<C>, id: &str) -> WaitOutcome {
    let store = ctx.store.clone();
    let id_owned = id.to_string();
    let (tx, rx) = tokio::sync::oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name(format!("waitlock-{id}"))
        .spawn(move || {
            let _ = tx.send(store.open(&id_owned).and_then(|h| h.wait_for_death()));
        });
    if let Err(e) = spawned {
        warn!(id = %id, error = %e, "lock wait thread failed, worker exiting");
        return WaitOutcome::Failed;
    }
    match rx.await {
        Ok(Ok(())) => WaitOutcome::Dead,
        Ok(Err(LockError::Deadlock)) => WaitOutcome::Deadlock,
        Ok(Err(e)) => {
            warn!(id = %id, error = %e, "lock wait failed, worker exiting");
            WaitOutcome::Failed
        }
        Err(_) => {
            warn!(id = %id, "lock wait thread vanished, worker exiting");
            WaitOutcome::Failed
        }
    }
}

/// Parent-side header update after a spawn. The store's open retries
/// bridge the window in which the child is still creating the file.
async fn update_header<C: Clock>(
    ctx: &SupervisorCtx<C>,
    id: &str,
    pid: u32,
    run_count: u32,
    start_time: u64,
) {
    let store = ctx.store.clone();
    let id_owned = id.to_string();
    let joined = tokio::task::spawn_blocking(move || {
        store.open(&id_owned).and_then(|h| h.record_spawn(pid, run_count, start_time))
    })
    .await;
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(id = %id, error = %e, "lockfile header update failed"),
        Err(e) => warn!(id = %id, error = %e, "lockfile header update task failed"),
    }
}

/// 1 Hz existence probe. Our own dead child would linger as a zombie and
/// keep the probe succeeding, so reap it eagerly while polling.
async fn poll_until_dead(pid: u32, child: &mut Option<Child>) {
    loop {
        if let Some(c) = child.as_mut() {
            if matches!(c.try_wait(), Ok(Some(_))) {
                child.take();
                return;
            }
        }
        if !pid_alive(pid) {
            return;
        }
        tokio::time::sleep(DEADLOCK_POLL).await;
    }
}

/// Reap the zombie left by our own child, if the dead process was ours.
async fn reap(child: &mut Option<Child>) {
    if let Some(mut c) = child.take() {
        let _ = c.wait().await;
    }
}

fn set_state<C: Clock>(ctx: &SupervisorCtx<C>, idx: ProcIdx, state: ProcessState) {
    ctx.table.lock().get_mut(idx).state = state;
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
