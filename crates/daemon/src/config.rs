// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: fixed paths under the state directory, plus the
//! abstract-namespace control socket name.

use crate::env::{self};
use crate::lifecycle::LifecycleError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Daemon configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/upstart`).
    pub state_dir: PathBuf,
    /// Directory job definition files (`*.toml`) are loaded from.
    pub job_dir: PathBuf,
    /// Name of the abstract-namespace control socket (no leading NUL;
    /// `upstart_wire::ControlListener::bind` adds it).
    pub socket_name: String,
    /// Path to the lock/PID file.
    pub lock_path: PathBuf,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
    /// Whether this instance supervises a single user's session rather
    /// than the whole system. Session instances run the quiesce wait
    /// phase on shutdown; a system instance goes straight to the kill
    /// phase (there is no user session to give a grace period to).
    pub session_init: bool,
    /// Upper bound on how long one main-loop `poll()` blocks. Overridable
    /// so tests don't wait a full second for kill-timer/quiesce checks.
    pub tick: Duration,
}

impl Config {
    /// Load configuration for the system daemon.
    ///
    /// Uses fixed paths under `state_dir` (`$UPSTART_STATE_DIR`,
    /// `$XDG_STATE_HOME/upstart`, or `~/.local/state/upstart`); one daemon
    /// serves every job on the host.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let socket_name = std::env::var("UPSTART_SOCKET_NAME")
            .unwrap_or_else(|_| "upstart-control".to_string());

        let session_init = std::env::var("UPSTART_SESSION_INIT")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        Ok(Self {
            job_dir: env::job_dir(&state_dir),
            socket_name,
            lock_path: state_dir.join("upstartd.pid"),
            log_path: state_dir.join("upstartd.log"),
            session_init,
            tick: env::tick_ms().unwrap_or(DEFAULT_TICK),
            state_dir,
        })
    }
}
