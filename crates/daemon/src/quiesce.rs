// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown: stop every running job, giving session instances a
//! wait phase in which a `session-end` reaction can still start and run
//! before everything is signalled to stop.

use std::time::{Duration, Instant};

use tracing::info;

use upstart_core::job::JobState;
use upstart_engine::Trigger;

use crate::state::{DaemonError, DaemonState};

const WAIT_PHASE: Duration = Duration::from_secs(5);
const SESSION_END_EVENT: &str = "session-end";

enum Phase {
    /// Waiting for jobs that were already running when quiesce began to
    /// finish stopping, while letting `session-end` reactions run.
    Waiting {
        deadline: Instant,
        pending: Vec<(String, String)>,
    },
    /// Every job has been told to stop; waiting for the slowest
    /// `kill_timeout` to either succeed or expire.
    Killing { deadline: Instant },
}

/// Drives the wait-then-kill sequence described in the shutdown/quiesce
/// module. Owned by the main loop; `tick` is polled once per iteration
/// while a quiesce is in progress.
pub struct Quiesce {
    phase: Option<Phase>,
}

impl Quiesce {
    pub fn new() -> Self {
        Self { phase: None }
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_some()
    }

    /// Start quiescing. `session_init` instances get the wait phase (only
    /// if some job actually reacts to `session-end`); a system instance
    /// has no user session to wait on and goes straight to the kill phase.
    pub fn begin(
        &mut self,
        state: &mut DaemonState,
        session_init: bool,
        now: Instant,
    ) -> Result<(), DaemonError> {
        if self.phase.is_some() {
            return Ok(());
        }

        let session_end_reactor_exists = session_init
            && state
                .registry
                .config_names()
                .filter_map(|name| state.registry.config(name).cloned())
                .any(|config| {
                    config
                        .start_on
                        .as_ref()
                        .is_some_and(|op| op.references(SESSION_END_EVENT))
                });

        let pending: Vec<(String, String)> = state
            .registry
            .jobs()
            .filter(|job| job.state != JobState::Waiting)
            .map(|job| (job.config_name.clone(), job.instance.clone()))
            .collect();

        state
            .queue
            .push(SESSION_END_EVENT, Vec::new(), upstart_core::Environment::new());
        state.process_events()?;

        self.phase = Some(if session_end_reactor_exists {
            info!("quiesce: waiting up to {:?} for session-end reactions", WAIT_PHASE);
            Phase::Waiting {
                deadline: now + WAIT_PHASE,
                pending,
            }
        } else {
            begin_kill(state, now)?
        });
        Ok(())
    }

    /// Advance the quiesce state machine. Returns `true` once every job
    /// has reached `waiting` (or the kill-phase deadline has passed),
    /// meaning the daemon may now exit.
    pub fn tick(&mut self, state: &mut DaemonState, now: Instant) -> Result<bool, DaemonError> {
        match &self.phase {
            None => Ok(false),
            Some(Phase::Waiting { deadline, pending }) => {
                let settled = pending
                    .iter()
                    .all(|(name, instance)| is_waiting(state, name, instance));
                if settled || now >= *deadline {
                    info!("quiesce: wait phase complete, stopping every job");
                    self.phase = Some(begin_kill(state, now)?);
                }
                Ok(false)
            }
            Some(Phase::Killing { deadline }) => {
                let settled = state.registry.jobs().all(|job| job.state == JobState::Waiting);
                Ok(settled || now >= *deadline)
            }
        }
    }
}

fn is_waiting(state: &DaemonState, name: &str, instance: &str) -> bool {
    state
        .registry
        .get(name, instance)
        .is_none_or(|job| job.state == JobState::Waiting)
}

/// Stop every job still running, and arm the kill-phase deadline to the
/// slowest of their `kill_timeout`s.
fn begin_kill(state: &mut DaemonState, now: Instant) -> Result<Phase, DaemonError> {
    let mut max_timeout = Duration::ZERO;
    let keys: Vec<(String, String)> = state
        .registry
        .jobs()
        .filter(|job| job.state != JobState::Waiting)
        .map(|job| (job.config_name.clone(), job.instance.clone()))
        .collect();

    for (name, instance) in keys {
        if let Some(config) = state.registry.config(&name) {
            max_timeout = max_timeout.max(config.kill_timeout);
        }
        state.drive_job(&name, &instance, Trigger::GoalStop)?;
    }

    Ok(Phase::Killing {
        deadline: now + max_timeout,
    })
}

#[cfg(test)]
#[path = "quiesce_tests.rs"]
mod tests;
