// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects the job state machine asks the main loop to carry out.
//!
//! The state machine in [`crate::machine`] never forks, signals or writes
//! to a socket itself — it returns a list of [`Effect`] values describing
//! what should happen, and the daemon main loop executes them. This keeps
//! every state transition a pure function over `(Job, JobConfig, Trigger)`,
//! testable without touching a real process tree.

use std::time::Duration;
use upstart_core::environment::Environment;
use upstart_core::job::ProcessType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fork and exec a job's process slot.
    Spawn {
        job_key: String,
        process: ProcessType,
        command: String,
        env: Environment,
    },
    /// Send a signal to a running pid (graceful stop, escalation).
    Signal { pid: i32, signal: i32 },
    /// Arm a one-shot kill timer; if it fires before the process is
    /// reaped, the main loop escalates to `SIGKILL`.
    StartKillTimer { job_key: String, after: Duration },
    CancelKillTimer { job_key: String },
    /// Begin ptrace-following a pid for a daemonising job.
    ArmTrace { job_key: String, pid: i32 },
    /// Push a new event onto the queue.
    EmitEvent {
        name: String,
        args: Vec<String>,
        env: Environment,
    },
}
