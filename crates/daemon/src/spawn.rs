// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process spawning.
//!
//! The supervised child acquires its own lockfile between `fork` and
//! `exec`: fcntl record locks belong to the process and survive `exec`, so
//! the lock taken here lives exactly as long as the child and is released
//! by the kernel on death. The descriptor is opened without `O_CLOEXEC` so
//! the lock's backing file stays open in the exec'd image.
//!
//! Everything inside the `pre_exec` closure runs in the forked child before
//! `exec` and is restricted to async-signal-safe calls: raw `libc` syscalls
//! on buffers prepared by the parent, no allocation.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::process::Stdio;

use nix::libc;
use procmon_lockfile::{LockRecord, LockStore, PID_OFFSET};
use tokio::process::{Child, Command};

/// Spawn the command line for `id` in its own session.
///
/// With `own_lockfile` set, the child writes and locks its lockfile before
/// `exec` (ordinary supervised processes). Supervisor peers pass false:
/// the exec'd supervisor claims its own lockfile at startup.
pub fn spawn_child(
    store: &LockStore,
    id: &str,
    exec: &str,
    run_count: u32,
    start_time: u64,
    own_lockfile: bool,
) -> io::Result<Child> {
    let mut tokens = exec.split_whitespace();
    let program = tokens
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty exec string"))?;

    let mut cmd = Command::new(program);
    cmd.args(tokens);
    cmd.stdin(Stdio::null());

    if own_lockfile {
        let path = CString::new(store.path(id).as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "lockfile path contains NUL"))?;
        // pid patched in by the child; see PID_OFFSET write below.
        let record = LockRecord::new(0, run_count, start_time, exec).encode();
        unsafe {
            cmd.pre_exec(move || child_setup(&path, &record));
        }
    } else {
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    cmd.spawn()
}

/// Post-fork, pre-exec: new session, then create, lock, and fill the
/// lockfile. Failure aborts the exec and surfaces as a spawn error in the
/// parent.
fn child_setup(path: &CString, record: &[u8]) -> io::Result<()> {
    // Safety: only async-signal-safe libc calls, operating on memory the
    // parent prepared before forking.
    unsafe {
        if libc::setsid() == -1 {
            return Err(io::Error::last_os_error());
        }

        let fd = libc::open(path.as_ptr(), libc::O_RDWR | libc::O_CREAT, 0o644 as libc::c_uint);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        // Lock before writing so a losing racer cannot wipe a live record.
        let fl = libc::flock {
            l_type: libc::F_WRLCK as libc::c_short,
            l_whence: libc::SEEK_SET as libc::c_short,
            l_start: 0,
            l_len: 1,
            l_pid: 0,
        };
        if libc::fcntl(fd, libc::F_SETLK, &fl as *const libc::flock) == -1 {
            return Err(io::Error::last_os_error());
        }

        if libc::ftruncate(fd, 0) == -1 {
            return Err(io::Error::last_os_error());
        }

        let pid = (libc::getpid() as u32).to_le_bytes();
        write_all(fd, &pid)?;
        write_all(fd, &record[PID_OFFSET as usize + 4..])?;
        // fd intentionally left open: it carries the lock across exec.
    }
    Ok(())
}

fn write_all(fd: libc::c_int, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        buf = &buf[n as usize..];
    }
    Ok(())
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
