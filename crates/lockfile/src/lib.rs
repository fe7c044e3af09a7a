// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process lockfile protocol.
//!
//! A lockfile is the sole synchronisation artefact between the supervisor,
//! the supervised child, and short-lived control-plane invocations. It
//! combines three roles: a liveness signal (an exclusive `fcntl` write lock
//! on byte 0, held by the running process and released by the kernel on
//! death), a status record (pid, run count, start time, command line), and
//! a control mailbox (a 4-byte word operators flip to suspend or delete
//! monitoring).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod record;
mod store;

pub use record::{
    LockRecord, EXEC_OFFSET, HEADER_LEN, PID_OFFSET, RUN_COUNT_OFFSET, START_TIME_OFFSET,
    TERMINATE_OFFSET,
};
pub use store::{pid_alive, LockError, LockHandle, LockStore};

/// Control word: normal operation.
pub const CONTROL_NORMAL: u32 = 0x0000_0000;
/// Control word: operator suspended monitoring; do not restart.
pub const CONTROL_SUSPEND: u32 = 0xDEAD_BEEF;
/// Control word: delete monitoring; the worker unlinks the lockfile and exits.
pub const CONTROL_DELETE: u32 = 0xDEAF_BABE;

/// Reserved lockfile id of the primary supervisor.
pub const PRIMARY_ID: &str = "procmon1";
/// Reserved lockfile id of the backup supervisor.
pub const BACKUP_ID: &str = "procmon2";

/// Whether an id names one of the two supervisor lockfiles.
pub fn is_supervisor_id(id: &str) -> bool {
    id == PRIMARY_ID || id == BACKUP_ID
}
