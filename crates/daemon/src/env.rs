// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use crate::lifecycle::LifecycleError;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: UPSTART_STATE_DIR > XDG_STATE_HOME/upstart > ~/.local/state/upstart
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("UPSTART_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("upstart"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/upstart"))
}

/// Job definition directory: UPSTART_JOB_DIR, or `<state_dir>/jobs`.
pub fn job_dir(state_dir: &std::path::Path) -> PathBuf {
    std::env::var("UPSTART_JOB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir.join("jobs"))
}

/// Poll tick interval override, for tests that want faster kill-timer checks.
pub fn tick_ms() -> Option<Duration> {
    std::env::var("UPSTART_TICK_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
