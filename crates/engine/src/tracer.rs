// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Following a daemonising job's process through `fork`/`SIGSTOP` via
//! `ptrace`, so the engine knows which pid is actually the long-running
//! service instead of the short-lived process that `exec`'d it.
//!
//! A job declares how it daemonises with `expect stop|fork|daemon`. This
//! module tracks the pure state ([`TraceState`]) of that expectation; the
//! daemon main loop owns the real `PTRACE_*` calls (via `nix::sys::ptrace`)
//! and feeds observed events back in through [`advance`].

use crate::effect::Effect;
use upstart_core::job::{JobExpect, TraceState};

/// An observation fed back from `waitpid`/`ptrace` about a traced process.
#[derive(Debug, Clone, Copy)]
pub enum TraceEvent {
    /// The traced process forked; `child_pid` is the new child.
    Forked { child_pid: i32 },
    /// The traced process raised `SIGSTOP` on itself (`expect stop`).
    Stopped,
    /// The traced process exited before satisfying its expectation.
    Exited,
}

/// The outcome of folding one [`TraceEvent`] into a [`TraceState`].
pub struct Advance {
    pub state: TraceState,
    /// Set when the pid the engine should consider "the job" changes,
    /// i.e. tracing followed a fork into a new child.
    pub tracked_pid: Option<i32>,
    pub effects: Vec<Effect>,
}

/// Fold one observed `ptrace` event into the next [`TraceState`].
///
/// `job_key` and `pid` identify the currently-traced process for building
/// effects; `pid` is the pid the event was observed on, which for `Forked`
/// is the *parent* (the child's pid is in the event).
pub fn advance(expect: JobExpect, state: TraceState, job_key: &str, pid: i32, event: TraceEvent) -> Advance {
    use TraceEvent::*;

    match (expect, state, event) {
        (JobExpect::None, _, _) => Advance {
            state: TraceState::Normal,
            tracked_pid: None,
            effects: Vec::new(),
        },

        (JobExpect::Stop, _, Stopped) => Advance {
            state: TraceState::Normal,
            tracked_pid: None,
            effects: vec![Effect::Signal {
                pid,
                signal: libc::SIGCONT,
            }],
        },

        (JobExpect::Fork, TraceState::New, Forked { child_pid }) => Advance {
            state: TraceState::Normal,
            tracked_pid: Some(child_pid),
            effects: Vec::new(),
        },

        (JobExpect::Daemon, TraceState::New, Forked { child_pid }) => Advance {
            state: TraceState::NewChild,
            tracked_pid: Some(child_pid),
            effects: vec![Effect::ArmTrace {
                job_key: job_key.to_string(),
                pid: child_pid,
            }],
        },
        (JobExpect::Daemon, TraceState::NewChild, Forked { child_pid }) => Advance {
            state: TraceState::Normal,
            tracked_pid: Some(child_pid),
            effects: Vec::new(),
        },

        (_, _, Exited) => Advance {
            state: TraceState::NotTracing,
            tracked_pid: None,
            effects: Vec::new(),
        },

        // Any other (expect, state, event) combination is an event the
        // traced process was not expected to produce yet; ignore it and
        // keep waiting rather than treat it as settled.
        (_, state, _) => Advance {
            state,
            tracked_pid: None,
            effects: Vec::new(),
        },
    }
}

/// Whether a `TraceState` means the job should be considered fully up.
pub fn is_settled(expect: JobExpect, state: TraceState) -> bool {
    matches!(expect, JobExpect::None) || matches!(state, TraceState::Normal)
}

#[cfg(test)]
#[path = "tracer_tests.rs"]
mod tests;
