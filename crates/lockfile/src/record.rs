// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary lockfile record layout.
//!
//! The header is hand-framed at fixed little-endian offsets so the control
//! word stays a single aligned 4-byte write; no structure-aware
//! serialisation is involved. The raw exec string follows the header and
//! runs to end of file.

use crate::store::LockError;

/// Byte offset of the pid field.
pub const PID_OFFSET: u64 = 0;
/// Byte offset of the `terminate` control word. 4-byte aligned.
pub const TERMINATE_OFFSET: u64 = 4;
/// Byte offset of the cumulative run count.
pub const RUN_COUNT_OFFSET: u64 = 8;
/// Byte offset of the start time (epoch seconds).
pub const START_TIME_OFFSET: u64 = 12;
/// Byte offset of the trailing exec string.
pub const EXEC_OFFSET: u64 = 20;

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = EXEC_OFFSET as usize;

/// Decoded contents of one lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// OS pid of the current or last instance.
    pub pid: u32,
    /// Control word; see the `CONTROL_*` constants.
    pub terminate: u32,
    /// Cumulative spawn count.
    pub run_count: u32,
    /// Wall-clock time of the most recent spawn, in epoch seconds.
    pub start_time: u64,
    /// Command line of the supervised process.
    pub exec: String,
}

impl LockRecord {
    pub fn new(pid: u32, run_count: u32, start_time: u64, exec: impl Into<String>) -> Self {
        Self { pid, terminate: 0, run_count, start_time, exec: exec.into() }
    }

    /// Encode the full record, header followed by the raw exec bytes.
    pub fn encode(&self) -> Vec<u8> {
        let exec = self.exec.as_bytes();
        let mut buf = Vec::with_capacity(HEADER_LEN + exec.len());
        buf.extend_from_slice(&self.pid.to_le_bytes());
        buf.extend_from_slice(&self.terminate.to_le_bytes());
        buf.extend_from_slice(&self.run_count.to_le_bytes());
        buf.extend_from_slice(&self.start_time.to_le_bytes());
        buf.extend_from_slice(exec);
        buf
    }

    /// Decode a record read back from disk.
    ///
    /// A buffer shorter than the header is a torn or corrupt file and
    /// yields [`LockError::Unusable`]. Non-UTF-8 exec bytes are replaced
    /// rather than rejected; `list` output degrades, nothing else does.
    pub fn decode(buf: &[u8]) -> Result<Self, LockError> {
        if buf.len() < HEADER_LEN {
            return Err(LockError::Unusable);
        }
        let u32_at = |off: u64| {
            let off = off as usize;
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&buf[off..off + 4]);
            u32::from_le_bytes(bytes)
        };
        let mut start_bytes = [0u8; 8];
        start_bytes.copy_from_slice(&buf[START_TIME_OFFSET as usize..HEADER_LEN]);

        Ok(Self {
            pid: u32_at(PID_OFFSET),
            terminate: u32_at(TERMINATE_OFFSET),
            run_count: u32_at(RUN_COUNT_OFFSET),
            start_time: u64::from_le_bytes(start_bytes),
            exec: String::from_utf8_lossy(&buf[HEADER_LEN..]).into_owned(),
        })
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
