// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Glue between the pure `upstart-engine` state machine and the side
//! effects `upstart-daemon` actually carries out: driving one job through
//! however many [`Trigger`]s one starting event produces, and offering
//! queued events to every job's `start on`/`stop on` condition tree.

use upstart_core::clock::Clock;
use upstart_core::event::Event;
use upstart_core::job::{Job, JobConfig};
use upstart_core::registry::JobRegistry;
use upstart_engine::queue::EventQueue;
use upstart_engine::{step, Trigger};

use crate::effects::{Executor, ExecutorError};

/// Advance `job` through `trigger`, and through every follow-on
/// `ProcessSpawned` trigger a spawn effect produces, until the state
/// machine has nothing further to say.
pub fn drive(
    job: &mut Job,
    config: &JobConfig,
    trigger: Trigger,
    clock: &dyn Clock,
    executor: &mut Executor,
    queue: &mut EventQueue,
) -> Result<(), ExecutorError> {
    let mut pending = vec![trigger];
    while let Some(trigger) = pending.pop() {
        let effects = step(job, config, trigger, clock);
        let spawned = executor.apply(effects, queue)?;
        for process in spawned {
            pending.push(Trigger::ProcessSpawned {
                process: process.process,
                pid: process.pid,
            });
        }
    }
    Ok(())
}

/// Offer every `Pending` event in `queue` to every loaded job's start/stop
/// condition, driving goal changes where a tree becomes fully matched.
pub fn process_pending_events(
    registry: &mut JobRegistry,
    queue: &mut EventQueue,
    clock: &dyn Clock,
    executor: &mut Executor,
) -> Result<(), ExecutorError> {
    for id in queue.pending_ids() {
        let Some(event) = queue.get_mut(id) else {
            continue;
        };
        event.begin_handling();
        let snapshot = event.clone();

        let keys: Vec<(String, String)> = registry
            .jobs()
            .map(|job| (job.config_name.clone(), job.instance.clone()))
            .collect();

        for (config_name, instance) in keys {
            let Some(config) = registry.config(&config_name).cloned() else {
                continue;
            };
            let job = registry
                .get_mut(&config_name, &instance)
                .expect("key came from jobs() on the same registry");
            offer_to_job(job, &config, &snapshot, clock, executor, queue)?;
        }

        if let Some(event) = queue.get_mut(id) {
            event.finish();
        }
    }
    queue.retire_settled();
    Ok(())
}

fn offer_to_job(
    job: &mut Job,
    config: &JobConfig,
    event: &Event,
    clock: &dyn Clock,
    executor: &mut Executor,
    queue: &mut EventQueue,
) -> Result<(), ExecutorError> {
    let mut goal_start = false;
    if job.state.is_waiting() {
        if let Some(cond) = &mut job.start_condition {
            if cond.handle(event) {
                cond.collect(&[event], &mut job.env);
                cond.reset();
                goal_start = true;
            }
        }
    }
    if goal_start {
        drive(job, config, Trigger::GoalStart, clock, executor, queue)?;
    }

    let mut goal_stop = false;
    if job.state.is_running() {
        if let Some(cond) = &mut job.stop_condition {
            if cond.handle(event) {
                cond.collect(&[event], &mut job.env);
                cond.reset();
                goal_stop = true;
            }
        }
    }
    if goal_stop {
        drive(job, config, Trigger::GoalStop, clock, executor, queue)?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
