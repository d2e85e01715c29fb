// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! upstartd — background process that owns the job registry, the event
//! queue, and the control socket clients talk to through `initctl`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bridge;
mod config;
mod dispatch;
mod effects;
mod env;
mod jobconf;
mod lifecycle;
mod quiesce;
mod run;
mod signals;
mod state;

use std::io::Write;

use tracing::{error, info};

use config::Config;
use lifecycle::LifecycleError;
use state::DaemonState;

const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("upstartd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: upstartd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    setup_logging(&config)?;

    info!("starting upstartd");

    let started = match lifecycle::startup(&config) {
        Ok(started) => started,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("upstartd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start upstartd: {e}");
            return Err(e.into());
        }
    };

    let configs = jobconf::load_dir(&config.job_dir)?;
    info!(count = configs.len(), "loaded job definitions");
    let state = DaemonState::new(configs);

    let mut main_loop = run::MainLoop::new(
        started.listener,
        state,
        config.job_dir.clone(),
        config.session_init,
        config.tick,
    )?;
    main_loop.run()?;

    info!("upstartd stopped");
    Ok(())
}

fn print_help() {
    println!("upstartd {}", env!("CARGO_PKG_VERSION"));
    println!("Event-driven service supervisor daemon");
    println!();
    println!("USAGE:");
    println!("    upstartd");
    println!();
    println!("upstartd is normally started by the system and should not be");
    println!("invoked directly. Control it with `initctl`.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

/// Truncate the log file once it crosses [`MAX_LOG_BYTES`], so a
/// long-running daemon doesn't grow its log file without bound.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let Ok(metadata) = std::fs::metadata(log_path) else {
        return;
    };
    if metadata.len() > MAX_LOG_BYTES {
        let rotated = log_path.with_extension("log.old");
        let _ = std::fs::rename(log_path, rotated);
    }
}

/// Write a marker line to the log file before tracing is set up, so a
/// client that just started the daemon has something to read even if
/// logging setup itself fails.
fn write_startup_marker(config: &Config) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "--- upstartd starting, pid {} ---", std::process::id())
}

fn write_startup_error(config: &Config, error: &LifecycleError) {
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    {
        let _ = writeln!(file, "upstartd failed to start: {error}");
    }
}

/// Set up `tracing` to write to the daemon's log file. Unlike a
/// multi-threaded daemon there is no non-blocking writer to flush on drop
/// here; the subscriber holds the file handle for the life of the process.
fn setup_logging(config: &Config) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    Ok(())
}
