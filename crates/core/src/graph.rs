// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency graph over process records.
//!
//! Records live in a flat vector; parent/child edges are indices into it.
//! Edges are installed symmetrically in a second pass, so
//! `p ∈ q.parents ⇔ q ∈ p.children` holds by construction.

use thiserror::Error;

use crate::process::{ProcessRecord, ProcessSpec};

/// Index of a record in a [`ProcessTable`].
pub type ProcIdx = usize;

/// Errors raised while materialising the graph from configuration.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("process id must not be empty")]
    EmptyId,

    #[error("duplicate process id: {0}")]
    DuplicateId(String),

    #[error("process '{id}' depends on unknown id '{depends}'")]
    DependencyMissing { id: String, depends: String },

    #[error("process '{0}' depends on itself")]
    SelfDependency(String),
}

/// Flat table of process records, in configuration order.
///
/// Configuration order is observable: the scheduler uses it as the
/// tie-break between independent roots.
#[derive(Debug, Default)]
pub struct ProcessTable {
    records: Vec<ProcessRecord>,
}

impl ProcessTable {
    /// Build the table in two passes: materialise records by id, then
    /// resolve declared dependencies into symmetric parent/child edges.
    ///
    /// Cycles are not rejected here; cyclic records simply never become
    /// runnable.
    pub fn build(specs: &[ProcessSpec]) -> Result<Self, GraphError> {
        let mut records: Vec<ProcessRecord> = Vec::with_capacity(specs.len());
        for spec in specs {
            if spec.id.is_empty() {
                return Err(GraphError::EmptyId);
            }
            if records.iter().any(|r| r.id == spec.id) {
                return Err(GraphError::DuplicateId(spec.id.clone()));
            }
            records.push(ProcessRecord::from_spec(spec));
        }

        for (child, spec) in specs.iter().enumerate() {
            for dep in &spec.depends {
                if *dep == spec.id {
                    return Err(GraphError::SelfDependency(spec.id.clone()));
                }
                let parent = records.iter().position(|r| r.id == *dep).ok_or_else(|| {
                    GraphError::DependencyMissing { id: spec.id.clone(), depends: dep.clone() }
                })?;
                if !records[child].parents.contains(&parent) {
                    records[child].parents.push(parent);
                    records[parent].children.push(child);
                }
            }
        }

        Ok(Self { records })
    }

    /// Linear scan by id. Deterministic: first (only) match wins.
    pub fn find(&self, id: &str) -> Option<ProcIdx> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn get(&self, idx: ProcIdx) -> &ProcessRecord {
        &self.records[idx]
    }

    pub fn get_mut(&mut self, idx: ProcIdx) -> &mut ProcessRecord {
        &mut self.records[idx]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProcIdx, &ProcessRecord)> {
        self.records.iter().enumerate()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
