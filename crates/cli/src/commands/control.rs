// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane operations: kill, start, restart, delete.
//!
//! Each is a short-lived lockfile mutation plus at most one signal; the
//! long-running monitor workers observe the mutation on their next poll or
//! wake-up. A missing lockfile is reported immediately (the store's open
//! retries cover the fork/exec gap, not operator typos). A process that is
//! already gone is not an error: the mutation still records the operator's
//! intent.

use nix::errno::Errno;
use nix::sys::signal::{kill as send_signal, Signal};
use nix::unistd::Pid;
use procmon_core::{Clock, SystemClock};
use procmon_lockfile::{LockStore, CONTROL_DELETE, CONTROL_NORMAL, CONTROL_SUSPEND};

use crate::exit_error::ExitError;

/// Suspend monitoring and kill the current instance. The worker observes
/// the control word and will not restart it.
pub fn kill(store: &LockStore, id: &str) -> Result<(), ExitError> {
    let handle = store.open_now(id)?;
    let record = handle.read_record()?;
    handle.set_control(CONTROL_SUSPEND)?;
    handle.reset_start_time(SystemClock.epoch_secs())?;
    sigkill(record.pid)?;
    println!("{id}: monitoring suspended");
    Ok(())
}

/// Clear the control word; the worker resumes on its next poll.
pub fn start(store: &LockStore, id: &str) -> Result<(), ExitError> {
    let handle = store.open_now(id)?;
    handle.set_control(CONTROL_NORMAL)?;
    println!("{id}: monitoring resumed");
    Ok(())
}

/// Kill the current instance; the restart is the worker's natural
/// consequence of observing the death.
pub fn restart(store: &LockStore, id: &str) -> Result<(), ExitError> {
    let handle = store.open_now(id)?;
    let record = handle.read_record()?;
    sigkill(record.pid)?;
    println!("{id}: restarting");
    Ok(())
}

/// Flag the lockfile for deletion and kill the current instance. The
/// worker unlinks the lockfile and exits for good.
pub fn delete(store: &LockStore, id: &str) -> Result<(), ExitError> {
    let handle = store.open_now(id)?;
    let record = handle.read_record()?;
    handle.set_control(CONTROL_DELETE)?;
    handle.reset_start_time(SystemClock.epoch_secs())?;
    sigkill(record.pid)?;
    println!("{id}: monitoring deleted");
    Ok(())
}

/// SIGKILL, treating an already-dead target as success.
fn sigkill(pid: u32) -> Result<(), ExitError> {
    if pid == 0 {
        return Ok(());
    }
    match send_signal(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(ExitError::new(e as i32, format!("kill {pid}: {e}"))),
    }
}
