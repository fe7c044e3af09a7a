// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `procmon` - process supervisor and its control surface in one binary.
//!
//! Long-running daemon roles are selected with `-F` (primary) and `-f`
//! (backup); every other flag is a short-lived control-plane invocation
//! that talks to the daemon purely through lockfiles and signals.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod exit_error;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use procmon_daemon::Role;
use procmon_lockfile::LockStore;

use commands::list::OutputFormat;
use exit_error::ExitError;

#[derive(Parser)]
#[command(
    name = "procmon",
    about = "Supervise a declared set of processes with dependency-ordered startup",
    disable_help_flag = true
)]
struct Cli {
    /// Start the daemon in the backup role from the given config
    #[arg(short = 'f', value_name = "CONFIG")]
    backup: Option<PathBuf>,

    /// Start the daemon in the primary role from the given config
    #[arg(short = 'F', value_name = "CONFIG")]
    primary: Option<PathBuf>,

    /// List monitored processes
    #[arg(short = 'l')]
    list: bool,

    /// List monitored processes in the given format (plain or json)
    #[arg(short = 'o', value_name = "FORMAT")]
    output: Option<OutputFormat>,

    /// Suspend monitoring of a process and kill it
    #[arg(short = 'k', value_name = "ID")]
    kill: Option<String>,

    /// Resume monitoring of a suspended process
    #[arg(short = 's', value_name = "ID")]
    start: Option<String>,

    /// Restart a process
    #[arg(short = 'r', value_name = "ID")]
    restart: Option<String>,

    /// Delete monitoring of a process and remove its lockfile
    #[arg(short = 'd', value_name = "ID")]
    delete: Option<String>,

    /// Shut down every monitored process and both supervisors
    #[arg(short = 'x')]
    shutdown: bool,

    /// Verbose logging
    #[arg(short = 'v')]
    verbose: bool,

    /// Print usage
    #[arg(short = 'h')]
    help: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        if !e.message.is_empty() {
            eprintln!("procmon: {}", e.message);
        }
        std::process::exit(e.code);
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    if cli.help {
        usage();
        return Ok(());
    }

    // Daemon roles are handled explicitly; both take the config path but
    // only the primary brings up the user processes.
    if let Some(config) = &cli.primary {
        return commands::daemon(Role::Primary, config).await;
    }
    if let Some(config) = &cli.backup {
        return commands::daemon(Role::Backup, config).await;
    }

    let store = LockStore::from_env();
    if cli.list {
        return commands::list::run(&store, OutputFormat::Plain);
    }
    if let Some(format) = cli.output {
        return commands::list::run(&store, format);
    }
    if let Some(id) = &cli.kill {
        return commands::control::kill(&store, id);
    }
    if let Some(id) = &cli.start {
        return commands::control::start(&store, id);
    }
    if let Some(id) = &cli.restart {
        return commands::control::restart(&store, id);
    }
    if let Some(id) = &cli.delete {
        return commands::control::delete(&store, id);
    }
    if cli.shutdown {
        return commands::shutdown::run(&store).await;
    }

    usage();
    Ok(())
}

/// Usage goes to stderr; `-h` still exits 0.
fn usage() {
    let help = Cli::command().render_help();
    eprint!("{help}");
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
