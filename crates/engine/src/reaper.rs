// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translating a raw `waitpid` status into the [`ExitOutcome`] the state
//! machine understands.
//!
//! The daemon main loop owns the actual non-blocking `waitpid(-1, ...)`
//! loop (it has to interleave reaping with polling the control socket);
//! this module is just the pure classification step so that logic is
//! testable without a real child process.

use crate::machine::ExitOutcome;
use nix::sys::wait::WaitStatus;

/// Classify a reaped status. Returns `None` for statuses that aren't a
/// terminal exit — `Stopped`/`PtraceEvent`/`Continued`, which the process
/// tracer in [`crate::tracer`] handles instead.
pub fn classify(status: WaitStatus) -> Option<(i32, ExitOutcome)> {
    match status {
        WaitStatus::Exited(pid, code) => Some((pid.as_raw(), ExitOutcome::Exited(code))),
        WaitStatus::Signaled(pid, signal, _core_dumped) => {
            Some((pid.as_raw(), ExitOutcome::Signaled(signal as i32)))
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
