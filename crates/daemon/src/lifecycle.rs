// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: acquiring the pidfile lock and binding the
//! control socket before the main loop starts.

use std::fs::File;
use std::io::Write;

use fs2::FileExt;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use upstart_wire::{ControlListener, WireError};

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind control socket: {0}")]
    BindFailed(#[from] WireError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What startup hands back to `main`: the held pidfile lock and the bound
/// control socket. The lock file must stay alive for the process lifetime
/// (dropping it releases the `flock`).
pub struct Started {
    pub listener: ControlListener,
    #[allow(dead_code)]
    lock_file: File,
}

/// Acquire the pidfile lock and bind the control socket.
pub fn startup(config: &Config) -> Result<Started, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // OpenOptions without truncate so we don't wipe the running daemon's
    // pid before we know whether we actually hold the lock.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let listener = ControlListener::bind(&config.socket_name)?;
    info!(socket = %config.socket_name, "control socket bound");

    Ok(Started {
        listener,
        lock_file,
    })
}
