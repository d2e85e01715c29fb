// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executing [`Effect`]s: the one place in the daemon that actually calls
//! `fork`/`exec`/`kill`/`ptrace`. Everything upstream (`upstart-engine`)
//! only describes what should happen; this module does it.

use std::collections::HashMap;
use std::ffi::CString;
use std::time::{Duration, Instant};

use nix::sys::ptrace;
use nix::sys::signal::{kill, Signal};
use nix::unistd::{execvp, fork, ForkResult, Pid};
use thiserror::Error;
use tracing::{debug, warn};

use upstart_core::job::ProcessType;
use upstart_engine::spawn::needs_shell;
use upstart_engine::{Effect, EventQueue};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),
    #[error("signal delivery failed: {0}")]
    Signal(#[source] nix::Error),
    #[error("unknown signal number {0}")]
    UnknownSignal(i32),
    #[error("ptrace seize failed: {0}")]
    Ptrace(#[source] nix::Error),
}

/// A process that was just spawned, fed back into `upstart-engine` as a
/// [`upstart_engine::Trigger::ProcessSpawned`].
pub struct Spawned {
    pub job_key: String,
    pub process: ProcessType,
    pub pid: i32,
}

/// State the executor needs to carry between main-loop ticks: pending
/// kill-timer deadlines, keyed by job key.
#[derive(Debug, Default)]
pub struct Executor {
    kill_timers: HashMap<String, Instant>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every effect, pushing emitted events onto `queue` and
    /// returning the processes that were actually spawned (so the caller
    /// can feed `ProcessSpawned` back into the state machine).
    pub fn apply(
        &mut self,
        effects: Vec<Effect>,
        queue: &mut EventQueue,
    ) -> Result<Vec<Spawned>, ExecutorError> {
        let mut spawned = Vec::new();
        for effect in effects {
            match effect {
                Effect::Spawn {
                    job_key,
                    process,
                    command,
                    env,
                } => {
                    let pid = spawn_child(&command, env.iter())?;
                    debug!(job = %job_key, ?process, pid, "spawned");
                    spawned.push(Spawned {
                        job_key,
                        process,
                        pid,
                    });
                }
                Effect::Signal { pid, signal } => {
                    let signal = Signal::try_from(signal)
                        .map_err(|_| ExecutorError::UnknownSignal(signal))?;
                    if let Err(e) = kill(Pid::from_raw(pid), signal) {
                        if e != nix::Error::ESRCH {
                            return Err(ExecutorError::Signal(e));
                        }
                    }
                }
                Effect::StartKillTimer { job_key, after } => {
                    self.kill_timers.insert(job_key, Instant::now() + after);
                }
                Effect::CancelKillTimer { job_key } => {
                    self.kill_timers.remove(&job_key);
                }
                Effect::ArmTrace { job_key, pid } => {
                    arm_trace(Pid::from_raw(pid)).map_err(|e| {
                        warn!(job = %job_key, pid, "failed to arm ptrace: {e}");
                        e
                    })?;
                }
                Effect::EmitEvent { name, args, env } => {
                    queue.push(name, args, env);
                }
            }
        }
        Ok(spawned)
    }

    /// Job keys whose kill timer has fired by `now`, removing them so each
    /// fires only once.
    pub fn expired_kill_timers(&mut self, now: Instant) -> Vec<String> {
        let expired: Vec<String> = self
            .kill_timers
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.kill_timers.remove(key);
        }
        expired
    }

    /// Shortest time until the next kill timer fires, for sizing the
    /// `poll()` timeout.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.kill_timers
            .values()
            .map(|deadline| deadline.saturating_duration_since(now))
            .min()
    }
}

/// Arm ptrace-following for a daemonising job's process, tracking forks so
/// the daemon can see the pid it eventually settles on.
fn arm_trace(pid: Pid) -> Result<(), ExecutorError> {
    ptrace::seize(pid, ptrace::Options::PTRACE_O_TRACEFORK).map_err(ExecutorError::Ptrace)
}

/// Fork and exec one process slot, returning the child's pid immediately
/// (the daemon finds out how it fared via `SIGCHLD`/`waitpid`, not here).
fn spawn_child<'a>(
    command: &str,
    env: impl Iterator<Item = &'a str>,
) -> Result<i32, ExecutorError> {
    let env: Vec<String> = env.map(str::to_string).collect();

    // SAFETY: the child, between `fork` and `execvp`/`_exit`, only touches
    // async-signal-safe APIs (`ptrace::traceme`, `std::env::set_var`, which
    // is sound here because this process is single-threaded by design) and
    // never returns to the parent's call stack.
    match unsafe { fork() }.map_err(ExecutorError::Fork)? {
        ForkResult::Parent { child } => Ok(child.as_raw()),
        ForkResult::Child => {
            for entry in &env {
                if let Some((key, value)) = entry.split_once('=') {
                    std::env::set_var(key, value);
                }
            }
            exec_child(command);
            // SAFETY: the child never returns from `exec_child`, but if
            // `execvp` itself failed we must not unwind back into the
            // parent's stack or run its destructors.
            unsafe { libc::_exit(127) };
        }
    }
}

/// Replace the child's image with `command`, using `/bin/sh -c` for
/// anything containing shell metacharacters.
fn exec_child(command: &str) -> ! {
    let argv: Vec<CString> = if needs_shell(command) {
        vec![
            CString::new("/bin/sh").unwrap_or_default(),
            CString::new("-c").unwrap_or_default(),
            CString::new(command).unwrap_or_default(),
        ]
    } else {
        command
            .split_whitespace()
            .filter_map(|word| CString::new(word).ok())
            .collect()
    };
    let Some(first) = argv.first() else {
        // SAFETY: terminal failure path, no unwinding across the fork.
        unsafe { libc::_exit(127) };
    };
    let _ = execvp(first, &argv);
    // execvp only returns on failure.
    // SAFETY: terminal failure path, no unwinding across the fork.
    unsafe { libc::_exit(127) };
}

#[cfg(test)]
#[path = "effects_tests.rs"]
mod tests;
