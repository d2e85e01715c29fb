// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event data model: what travels through the event queue.

use crate::environment::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonically increasing event identifier, unique for the lifetime of
/// the daemon process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl EventId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Where an event sits in the queue's lifecycle.
///
/// An event moves strictly forward: `Pending` -> `Handling` -> `Finished`.
/// It leaves the queue once it is `Finished` and nothing is still blocking
/// on it (see [`Event::is_settled`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPhase {
    /// Queued, not yet offered to any job's operator tree.
    Pending,
    /// Offered to every job; some jobs may be blocking their own state
    /// transition on this event's completion.
    Handling,
    /// All jobs that were going to react have done so. Waiting on blockers
    /// to release before it can be dropped.
    Finished,
}

/// A single occurrence of something happening, as seen by the job engine.
///
/// Carries positional `args` (e.g. a job name for `starting`/`started`) and
/// an `env` table (e.g. `JOB=foo`, `RESULT=ok`) that gets folded into a
/// job's environment when an operator tree collects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    name: String,
    args: Vec<String>,
    env: Environment,
    phase: EventPhase,
    failed: bool,
    blockers: u32,
}

impl Event {
    pub fn new(id: EventId, name: impl Into<String>, args: Vec<String>, env: Environment) -> Self {
        Self {
            id,
            name: name.into(),
            args,
            env,
            phase: EventPhase::Pending,
            failed: false,
            blockers: 0,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Mark this event as a failure event (e.g. `<job>/<process> failed`).
    pub fn set_failed(&mut self, failed: bool) {
        self.failed = failed;
    }

    /// Advance `Pending` -> `Handling`. No-op once past `Pending`.
    pub fn begin_handling(&mut self) {
        if matches!(self.phase, EventPhase::Pending) {
            self.phase = EventPhase::Handling;
        }
    }

    /// Advance `Handling` -> `Finished`. No-op once past `Handling`.
    pub fn finish(&mut self) {
        if matches!(self.phase, EventPhase::Handling) {
            self.phase = EventPhase::Finished;
        }
    }

    /// A job blocked its own transition on this event; hold it in the
    /// queue until that job releases it.
    pub fn block(&mut self) {
        self.blockers += 1;
    }

    /// Release one blocker previously registered with [`Event::block`].
    pub fn unblock(&mut self) {
        self.blockers = self.blockers.saturating_sub(1);
    }

    pub fn blockers(&self) -> u32 {
        self.blockers
    }

    /// True once the event is `Finished` and nothing is still blocking on
    /// it — the point at which the queue may drop it.
    pub fn is_settled(&self) -> bool {
        matches!(self.phase, EventPhase::Finished) && self.blockers == 0
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
