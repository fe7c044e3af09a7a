// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process records and their lifecycle state machine.

use serde::{Deserialize, Serialize};

use crate::graph::ProcIdx;

/// Lifecycle state of a supervised process.
///
/// Successful bring-up advances `Init` → `Started` → `Running`, passing
/// through `Waiting` while a configured settle delay elapses. `Terminated`
/// is reached only when the record's worker exits for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Init,
    Started,
    Running,
    Terminated,
    Waiting,
}

crate::simple_display! {
    ProcessState {
        Init => "init",
        Started => "started",
        Running => "running",
        Terminated => "terminated",
        Waiting => "waiting",
    }
}

/// Declared shape of one supervised process, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Unique identifier within the configuration.
    pub id: String,
    /// Command line, whitespace-tokenised at spawn time.
    pub exec: String,
    /// Post-spawn settle delay in seconds.
    pub wait_seconds: u64,
    /// Delay after an observed death before restarting, in seconds.
    pub restart_delay_seconds: u64,
    /// Ids of processes that must be running before this one starts.
    pub depends: Vec<String>,
    /// Restart this process when a parent restarts.
    pub restart_on_parent_death: bool,
    /// When false, the process runs at most once per parent generation.
    pub monitored: bool,
    /// When true, the record is inert.
    pub skip: bool,
}

impl ProcessSpec {
    /// A spec with the given id and command and all options defaulted.
    pub fn new(id: impl Into<String>, exec: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            exec: exec.into(),
            wait_seconds: 0,
            restart_delay_seconds: 0,
            depends: Vec::new(),
            restart_on_parent_death: false,
            monitored: false,
            skip: false,
        }
    }
}

/// One in-memory process entity: declared shape plus runtime state.
///
/// Parent/child edges are indices into the owning [`ProcessTable`]
/// (records form cycles of references by design, so ownership sits in the
/// table's flat vector, never in the edges).
///
/// [`ProcessTable`]: crate::graph::ProcessTable
#[derive(Debug)]
pub struct ProcessRecord {
    pub id: String,
    pub exec: String,
    pub wait_seconds: u64,
    /// Mutable: dependent restarts propagate the parent's settle time here.
    pub restart_delay_seconds: u64,
    pub restart_on_parent_death: bool,
    pub monitored: bool,
    pub skip: bool,
    pub state: ProcessState,
    /// Count of spawn attempts. Never decreases.
    pub run_count: u32,
    pub parents: Vec<ProcIdx>,
    pub children: Vec<ProcIdx>,
}

impl ProcessRecord {
    pub fn from_spec(spec: &ProcessSpec) -> Self {
        Self {
            id: spec.id.clone(),
            exec: spec.exec.clone(),
            wait_seconds: spec.wait_seconds,
            restart_delay_seconds: spec.restart_delay_seconds,
            restart_on_parent_death: spec.restart_on_parent_death,
            monitored: spec.monitored,
            skip: spec.skip,
            state: ProcessState::Init,
            run_count: 0,
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Record a spawn attempt. Saturating: the count never wraps back down.
    pub fn bump_run_count(&mut self) -> u32 {
        self.run_count = self.run_count.saturating_add(1);
        self.run_count
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
