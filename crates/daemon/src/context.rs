// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared supervisor context threaded through every component entry point.

use parking_lot::Mutex;
use procmon_core::{Clock, ProcIdx, ProcessTable, SystemClock};
use procmon_lockfile::LockStore;
use tokio::task::JoinHandle;

/// Everything a monitor worker needs besides its own record index: the
/// process table, the worker slots, the lockfile store, and a clock.
///
/// There is deliberately no process-wide global; the context is built once
/// at startup and handed out as `Arc<SupervisorCtx<_>>`.
pub struct SupervisorCtx<C: Clock = SystemClock> {
    pub table: Mutex<ProcessTable>,
    pub store: LockStore,
    pub clock: C,
    workers: Mutex<Vec<Option<JoinHandle<()>>>>,
}

impl<C: Clock> SupervisorCtx<C> {
    pub fn new(table: ProcessTable, store: LockStore, clock: C) -> Self {
        let slots = (0..table.len()).map(|_| None).collect();
        Self { table: Mutex::new(table), store, clock, workers: Mutex::new(slots) }
    }

    /// Whether the record currently has a live monitor worker.
    pub fn worker_alive(&self, idx: ProcIdx) -> bool {
        self.workers.lock()[idx].as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Claim the worker slot for `idx` and install the handle produced by
    /// `spawn`. Returns false without calling `spawn` when a live worker
    /// already occupies the slot.
    pub(crate) fn claim_worker_slot(
        &self,
        idx: ProcIdx,
        spawn: impl FnOnce() -> JoinHandle<()>,
    ) -> bool {
        let mut workers = self.workers.lock();
        if workers[idx].as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        workers[idx] = Some(spawn());
        true
    }
}
