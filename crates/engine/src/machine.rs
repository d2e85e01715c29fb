// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job state machine: given a [`Job`], its [`JobConfig`], and one
//! [`Trigger`], decide the next [`upstart_core::job::JobState`] and the
//! [`Effect`]s needed to get there.
//!
//! Nothing here touches a real process. A trigger arrives because the main
//! loop observed something (a client asked for a goal change, a child
//! exited, a kill timer fired) and calls [`step`]; the returned effects are
//! what the main loop should do about it.

use crate::effect::Effect;
use crate::spawn;
use upstart_core::clock::Clock;
use upstart_core::job::{Job, JobConfig, JobExpect, JobGoal, JobState, ProcessType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
}

impl ExitOutcome {
    fn is_normal(self, normal_exit: &[i32]) -> bool {
        matches!(self, ExitOutcome::Exited(code) if normal_exit.contains(&code))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    GoalStart,
    GoalStop,
    /// The main loop finished a `fork`/`exec` for `process` and it's
    /// running as `pid`.
    ProcessSpawned { process: ProcessType, pid: i32 },
    /// `process`'s pid was reaped with `outcome`.
    ProcessExited {
        process: ProcessType,
        pid: i32,
        outcome: ExitOutcome,
    },
    /// The daemonising job's trace state reached [`upstart_core::job::TraceState::Normal`].
    TraceSettled,
    KillTimerExpired,
}

/// Advance `job` by one [`Trigger`]. Mutates `job` in place and returns the
/// effects the caller should carry out.
pub fn step(job: &mut Job, config: &JobConfig, trigger: Trigger, clock: &dyn Clock) -> Vec<Effect> {
    match trigger {
        Trigger::GoalStart => {
            job.goal = JobGoal::Start;
            if job.state == JobState::Waiting {
                begin_start(job, config)
            } else {
                Vec::new()
            }
        }
        Trigger::GoalStop => {
            job.goal = JobGoal::Stop;
            if job.state == JobState::Running {
                begin_stop(job, config)
            } else {
                Vec::new()
            }
        }
        Trigger::ProcessSpawned { process, pid } => handle_spawned(job, config, process, pid),
        Trigger::ProcessExited {
            process,
            pid,
            outcome,
        } => {
            if job.pid_of(process) != Some(pid) {
                // A stale report for a pid this job has already moved past
                // (e.g. the short-lived parent of an `expect fork` job).
                return Vec::new();
            }
            job.set_pid(process, None);
            handle_exit(job, config, process, outcome, clock)
        }
        Trigger::TraceSettled => {
            if job.state == JobState::Spawned {
                begin_post_start(job, config)
            } else {
                Vec::new()
            }
        }
        Trigger::KillTimerExpired => {
            if job.state == JobState::Stopping {
                match job.pid_of(ProcessType::Main) {
                    Some(pid) => vec![Effect::Signal {
                        pid,
                        signal: libc::SIGKILL,
                    }],
                    None => Vec::new(),
                }
            } else {
                Vec::new()
            }
        }
    }
}

fn emit(name: &str, job: &Job) -> Effect {
    Effect::EmitEvent {
        name: name.to_string(),
        args: vec![job.config_name.clone()],
        env: job.env.clone(),
    }
}

fn spawn_process(job: &Job, config: &JobConfig, process: ProcessType) -> Option<Effect> {
    let spec = config.processes.get(&process)?;
    let env = spawn::build_env(job, config, &[]).unwrap_or_else(|_| job.env.clone());
    Some(spawn::spawn_effect(job, process, spec, env))
}

fn begin_start(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    job.failed = false;
    job.state = JobState::Starting;
    let mut effects = vec![emit("starting", job)];

    if config.processes.contains_key(&ProcessType::PreStart) {
        job.state = JobState::PreStart;
        effects.extend(spawn_process(job, config, ProcessType::PreStart));
    } else {
        effects.extend(spawn_main(job, config));
    }
    effects
}

fn spawn_main(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    if config.processes.contains_key(&ProcessType::Main) {
        job.state = JobState::Spawned;
        spawn_process(job, config, ProcessType::Main)
            .into_iter()
            .collect()
    } else {
        begin_post_start(job, config)
    }
}

fn begin_post_start(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    if config.processes.contains_key(&ProcessType::PostStart) {
        job.state = JobState::PostStart;
        spawn_process(job, config, ProcessType::PostStart)
            .into_iter()
            .collect()
    } else {
        begin_running(job, config)
    }
}

fn begin_running(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    job.state = JobState::Running;
    if job.goal == JobGoal::Stop {
        return begin_stop(job, config);
    }
    vec![emit("started", job)]
}

fn begin_stop(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    if config.processes.contains_key(&ProcessType::PreStop) {
        job.state = JobState::PreStop;
        spawn_process(job, config, ProcessType::PreStop)
            .into_iter()
            .collect()
    } else {
        begin_stopping(job, config)
    }
}

fn begin_stopping(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    job.state = JobState::Stopping;
    match job.pid_of(ProcessType::Main) {
        Some(pid) => vec![
            Effect::Signal {
                pid,
                signal: libc::SIGTERM,
            },
            Effect::StartKillTimer {
                job_key: job.key(),
                after: config.kill_timeout,
            },
        ],
        None => begin_post_stop(job, config),
    }
}

fn begin_post_stop(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    job.state = JobState::Killed;
    let mut effects = vec![Effect::CancelKillTimer { job_key: job.key() }];
    if config.processes.contains_key(&ProcessType::PostStop) {
        job.state = JobState::PostStop;
        effects.extend(spawn_process(job, config, ProcessType::PostStop));
    } else {
        effects.extend(finish_stop(job, config));
    }
    effects
}

fn finish_stop(job: &mut Job, config: &JobConfig) -> Vec<Effect> {
    job.state = JobState::Waiting;
    job.respawn_count = 0;
    job.respawn_window_start_ms = None;
    let mut effects = vec![emit("stopped", job)];
    if job.goal == JobGoal::Start {
        effects.extend(begin_start(job, config));
    }
    effects
}

fn handle_spawned(job: &mut Job, config: &JobConfig, process: ProcessType, pid: i32) -> Vec<Effect> {
    job.set_pid(process, Some(pid));
    match (job.state, process) {
        (JobState::Spawned, ProcessType::Main) => {
            if matches!(config.expect, JobExpect::None) {
                begin_post_start(job, config)
            } else {
                vec![Effect::ArmTrace {
                    job_key: job.key(),
                    pid,
                }]
            }
        }
        _ => Vec::new(),
    }
}

fn handle_exit(
    job: &mut Job,
    config: &JobConfig,
    process: ProcessType,
    outcome: ExitOutcome,
    clock: &dyn Clock,
) -> Vec<Effect> {
    match (job.state, process) {
        (JobState::PreStart, ProcessType::PreStart) => {
            if outcome.is_normal(&config.normal_exit) {
                spawn_main(job, config)
            } else {
                job.failed = true;
                job.goal = JobGoal::Stop;
                begin_stop(job, config)
            }
        }
        (JobState::Spawned, ProcessType::Main) => {
            // The main process exited before settling (or before ever
            // being traced, for `expect: None` jobs) — that is always a
            // failure to start.
            job.failed = true;
            job.goal = JobGoal::Stop;
            begin_stop(job, config)
        }
        (JobState::PostStart, ProcessType::PostStart) => begin_running(job, config),
        (JobState::Running, ProcessType::Main) => {
            if job.goal == JobGoal::Stop {
                return begin_stop(job, config);
            }
            let normal = outcome.is_normal(&config.normal_exit);
            if config.respawn.respawn {
                respawn(job, config, clock, normal)
            } else {
                // The process ended on its own and nothing asked it to
                // respawn: the run is over, so the goal it was started
                // with is consumed. An explicit `GoalStart` trigger that
                // arrives before `Waiting` is reached (see `finish_stop`)
                // still restarts it.
                job.failed = !normal;
                job.goal = JobGoal::Stop;
                begin_stop(job, config)
            }
        }
        (JobState::PreStop, ProcessType::PreStop) => begin_stopping(job, config),
        (JobState::Stopping, ProcessType::Main) => begin_post_stop(job, config),
        (JobState::PostStop, ProcessType::PostStop) => finish_stop(job, config),
        _ => Vec::new(),
    }
}

fn respawn(job: &mut Job, config: &JobConfig, clock: &dyn Clock, normal: bool) -> Vec<Effect> {
    let now = clock.epoch_ms();
    let window_ms = config.respawn.interval.as_millis() as u64;
    let in_window = job
        .respawn_window_start_ms
        .is_some_and(|start| now.saturating_sub(start) <= window_ms);

    if in_window {
        job.respawn_count += 1;
    } else {
        job.respawn_window_start_ms = Some(now);
        job.respawn_count = 1;
    }

    if job.respawn_count > config.respawn.limit {
        job.goal = JobGoal::Stop;
        job.failed = true;
        return begin_stop(job, config);
    }

    job.failed = !normal;
    begin_start(job, config)
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
