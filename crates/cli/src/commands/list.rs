// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process listing: scan the lockfile directory, probe each recorded pid,
//! and render plain text or JSON.

use clap::ValueEnum;
use procmon_core::{format_elapsed, Clock, SystemClock};
use procmon_lockfile::{is_supervisor_id, pid_alive, LockRecord, LockStore};
use serde::Serialize;

use crate::exit_error::ExitError;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Serialize)]
pub struct ListEntry {
    name: String,
    pid: u32,
    runcount: u32,
    since: String,
    state: String,
    exec: String,
}

pub fn run(store: &LockStore, format: OutputFormat) -> Result<(), ExitError> {
    let mut ids = store.scan()?;
    // Supervisors first, then configuration ids alphabetically.
    ids.sort_by_key(|id| (!is_supervisor_id(id), id.clone()));

    let now = SystemClock.epoch_secs();
    let mut entries = Vec::new();
    for id in ids {
        match store.read_header(&id) {
            Ok(record) => {
                let alive = pid_alive(record.pid);
                entries.push(entry(&id, &record, alive, now));
            }
            // Torn or corrupt records degrade the listing, not the command.
            Err(e) => eprintln!("procmon: skipping {id}: {e}"),
        }
    }

    match format {
        OutputFormat::Plain => print!("{}", render_plain(&entries)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&entries)
                .map_err(|e| ExitError::new(1, e.to_string()))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn entry(id: &str, record: &LockRecord, alive: bool, now: u64) -> ListEntry {
    ListEntry {
        name: id.to_string(),
        pid: record.pid,
        runcount: record.run_count,
        since: format_elapsed(now.saturating_sub(record.start_time)),
        state: if alive { "running" } else { "stopped" }.to_string(),
        exec: record.exec.clone(),
    }
}

fn render_plain(entries: &[ListEntry]) -> String {
    let headers = ["Process Name", "pid", "Restarts", "Since", "Status", "Command"];
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    let rows: Vec<[String; 6]> = entries
        .iter()
        .map(|e| {
            [
                e.name.clone(),
                e.pid.to_string(),
                e.runcount.to_string(),
                e.since.clone(),
                e.state.clone(),
                e.exec.clone(),
            ]
        })
        .collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    render_row(&mut out, &headers.map(String::from), &widths);
    for row in &rows {
        render_row(&mut out, row, &widths);
    }
    out
}

fn render_row(out: &mut String, cells: &[String; 6], widths: &[usize]) {
    for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        if i == cells.len() - 1 {
            // Last column unpadded; commands can be long.
            out.push_str(cell);
        } else {
            out.push_str(&format!("{cell:<width$} "));
        }
    }
    out.push('\n');
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
