// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lockfile store: creation, lookup, header mutation, and the lock-based
//! death-detection primitive.
//!
//! Locks are POSIX `fcntl` record locks on byte range [0,1). They are owned
//! by a process (not a file descriptor), die with the process, and survive
//! `exec`, which is exactly the combination the death channel needs. The
//! kernel's deadlock detector (`EDEADLK`) is surfaced as
//! [`LockError::Deadlock`] so the two supervisors can mutually monitor each
//! other and fall back to pid polling.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;

use crate::record::{LockRecord, PID_OFFSET, RUN_COUNT_OFFSET, START_TIME_OFFSET, TERMINATE_OFFSET};

/// Filename prefix for every lockfile in the store directory.
const FILE_PREFIX: &str = "procmon.";

/// How often `open` re-probes a missing lockfile, and how many times.
const OPEN_RETRIES: u32 = 5;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lockfile already locked")]
    LockBusy,

    #[error("no lockfile for '{0}'")]
    NotFound(String),

    #[error("lockfile record is unusable")]
    Unusable,

    #[error("deadlock detected while waiting on lock")]
    Deadlock,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LockError {
    /// OS errno equivalent, for control-plane exit codes.
    pub fn errno(&self) -> i32 {
        match self {
            LockError::LockBusy => Errno::EAGAIN as i32,
            LockError::NotFound(_) => Errno::ENOENT as i32,
            LockError::Unusable => Errno::EINVAL as i32,
            LockError::Deadlock => Errno::EDEADLK as i32,
            LockError::Io(e) => e.raw_os_error().unwrap_or(Errno::EIO as i32),
        }
    }
}

/// Directory holding one lockfile per supervised process.
#[derive(Debug, Clone)]
pub struct LockStore {
    dir: PathBuf,
}

impl LockStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The conventional store: `/tmp`, or `PROCMON_LOCK_DIR` when set.
    pub fn from_env() -> Self {
        match std::env::var("PROCMON_LOCK_DIR") {
            Ok(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new("/tmp"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the lockfile for `id`.
    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}"))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path(id).exists()
    }

    /// Create (or take over) the lockfile for `id` and acquire the
    /// exclusive write lock on byte 0.
    ///
    /// The lock is taken before the record is written so a losing racer
    /// fails with [`LockError::LockBusy`] without wiping the live owner's
    /// record. The returned handle must be kept open for as long as the
    /// lock should be held.
    pub fn create(&self, id: &str, record: &LockRecord) -> Result<LockHandle, LockError> {
        // Open without truncating; the file may belong to a live owner
        // until the lock attempt says otherwise.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path(id))?;
        let handle = LockHandle { file, id: id.to_string() };
        handle.try_lock()?;
        handle.file.set_len(0)?;
        handle.file.write_all_at(&record.encode(), 0)?;
        Ok(handle)
    }

    /// Open an existing lockfile read/write, retrying while it does not
    /// exist yet. A freshly spawned child creates its lockfile between
    /// `fork` and `exec`; the retry window covers that gap.
    pub fn open(&self, id: &str) -> Result<LockHandle, LockError> {
        let mut attempt = 0;
        loop {
            match self.open_now(id) {
                Err(LockError::NotFound(_)) if attempt < OPEN_RETRIES => {
                    attempt += 1;
                    std::thread::sleep(OPEN_RETRY_DELAY);
                }
                other => return other,
            }
        }
    }

    /// Single open attempt, no retries.
    pub fn open_now(&self, id: &str) -> Result<LockHandle, LockError> {
        let file = OpenOptions::new().read(true).write(true).open(self.path(id)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LockError::NotFound(id.to_string())
            } else {
                LockError::Io(e)
            }
        })?;
        Ok(LockHandle { file, id: id.to_string() })
    }

    /// Read the record for `id` without retries.
    pub fn read_header(&self, id: &str) -> Result<LockRecord, LockError> {
        self.open_now(id)?.read_record()
    }

    /// Write the control word for `id`, without taking the lock.
    pub fn set_control(&self, id: &str, word: u32) -> Result<(), LockError> {
        self.open_now(id)?.set_control(word)
    }

    /// Overwrite the start time for `id` in place.
    pub fn reset_start_time(&self, id: &str, now: u64) -> Result<(), LockError> {
        self.open_now(id)?.reset_start_time(now)
    }

    /// Unlink the lockfile for `id`.
    pub fn delete(&self, id: &str) -> Result<(), LockError> {
        std::fs::remove_file(self.path(id)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LockError::NotFound(id.to_string())
            } else {
                LockError::Io(e)
            }
        })
    }

    /// Ids of every lockfile currently in the store directory.
    pub fn scan(&self) -> Result<Vec<String>, LockError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(id) = name.strip_prefix(FILE_PREFIX) {
                    if !id.is_empty() {
                        ids.push(id.to_string());
                    }
                }
            }
        }
        Ok(ids)
    }
}

/// An open lockfile.
///
/// Holding the handle keeps any lock taken through it alive; fcntl locks
/// are dropped when the owning process closes its last descriptor for the
/// file, so a handle whose lock matters must not be re-opened and closed
/// elsewhere in the same process.
#[derive(Debug)]
pub struct LockHandle {
    file: File,
    id: String,
}

impl LockHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Non-blocking exclusive write lock on byte 0.
    pub fn try_lock(&self) -> Result<(), LockError> {
        match fcntl_byte0(&self.file, libc::F_SETLK, libc::F_WRLCK as libc::c_short) {
            Ok(()) => Ok(()),
            Err(Errno::EACCES | Errno::EAGAIN) => Err(LockError::LockBusy),
            Err(e) => Err(errno_io(e)),
        }
    }

    /// Block until the byte-0 lock can be acquired, i.e. until its holder
    /// dies or releases, then release it again immediately.
    ///
    /// Returns `Ok(())` exactly once per observed death. `EDEADLK` means
    /// the holder is itself blocked on a lock we hold (the mutual
    /// supervisor pair); callers fall back to pid polling.
    pub fn wait_for_death(&self) -> Result<(), LockError> {
        loop {
            match fcntl_byte0(&self.file, libc::F_SETLKW, libc::F_WRLCK as libc::c_short) {
                Ok(()) => {
                    self.unlock();
                    return Ok(());
                }
                Err(Errno::EINTR) => continue,
                Err(Errno::EDEADLK) => return Err(LockError::Deadlock),
                Err(e) => return Err(errno_io(e)),
            }
        }
    }

    /// Drop the byte-0 lock if held. Errors are ignored; the kernel drops
    /// the lock at close anyway.
    pub fn unlock(&self) {
        let _ = fcntl_byte0(&self.file, libc::F_SETLK, libc::F_UNLCK as libc::c_short);
    }

    /// Read and decode the full record.
    pub fn read_record(&self) -> Result<LockRecord, LockError> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let mut offset = 0u64;
        loop {
            let n = self.file.read_at(&mut chunk, offset)?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            offset += n as u64;
        }
        LockRecord::decode(&buf)
    }

    /// Record a fresh spawn: pid, run count, and start time, leaving the
    /// control word and exec string untouched.
    pub fn record_spawn(&self, pid: u32, run_count: u32, start_time: u64) -> Result<(), LockError> {
        self.file.write_all_at(&pid.to_le_bytes(), PID_OFFSET)?;
        self.file.write_all_at(&run_count.to_le_bytes(), RUN_COUNT_OFFSET)?;
        self.file.write_all_at(&start_time.to_le_bytes(), START_TIME_OFFSET)?;
        Ok(())
    }

    /// Single aligned 4-byte write of the control word.
    pub fn set_control(&self, word: u32) -> Result<(), LockError> {
        self.file.write_all_at(&word.to_le_bytes(), TERMINATE_OFFSET)?;
        Ok(())
    }

    /// Overwrite the start time in place.
    pub fn reset_start_time(&self, now: u64) -> Result<(), LockError> {
        self.file.write_all_at(&now.to_le_bytes(), START_TIME_OFFSET)?;
        Ok(())
    }
}

/// Zero-signal existence probe. `EPERM` still means the process exists.
pub fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// One fcntl record-lock call covering byte range [0,1).
fn fcntl_byte0(file: &File, cmd: libc::c_int, l_type: libc::c_short) -> Result<(), Errno> {
    let fl = libc::flock {
        l_type,
        l_whence: libc::SEEK_SET as libc::c_short,
        l_start: 0,
        l_len: 1,
        l_pid: 0,
    };
    // Safety: the descriptor is owned by `file` and stays open across the
    // call; the flock struct outlives it on this stack frame.
    let res = unsafe { libc::fcntl(file.as_raw_fd(), cmd, &fl as *const libc::flock) };
    if res == -1 {
        Err(Errno::last())
    } else {
        Ok(())
    }
}

fn errno_io(e: Errno) -> LockError {
    LockError::Io(std::io::Error::from_raw_os_error(e as i32))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
