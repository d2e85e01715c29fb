// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Everything the main loop needs to hold between ticks: the job
//! registry, the event queue, the side-effect executor, and the clock
//! they're all driven against.

use std::time::Instant;

use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::warn;

use upstart_core::clock::SystemClock;
use upstart_core::job::{JobConfig, ProcessType, TraceState};
use upstart_core::registry::JobRegistry;
use upstart_engine::{classify_wait_status, tracer, EngineError, EventQueue, Trigger};

use crate::bridge::{self, drive};
use crate::effects::{Executor, ExecutorError};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("wait error: {0}")]
    Wait(#[source] nix::Error),
}

pub struct DaemonState {
    pub registry: JobRegistry,
    pub queue: EventQueue,
    pub executor: Executor,
    pub clock: SystemClock,
}

impl DaemonState {
    pub fn new(configs: Vec<JobConfig>) -> Self {
        let mut registry = JobRegistry::new();
        for config in configs {
            registry.set_config(config);
        }
        Self {
            registry,
            queue: EventQueue::new(),
            executor: Executor::new(),
            clock: SystemClock,
        }
    }

    /// Drive one job instance through `trigger`.
    pub fn drive_job(
        &mut self,
        config_name: &str,
        instance: &str,
        trigger: Trigger,
    ) -> Result<(), DaemonError> {
        let Some(config) = self.registry.config(config_name).cloned() else {
            return Err(EngineError::ConfigNotFound(config_name.to_string()).into());
        };
        let job = self.registry.instance(config_name, instance);
        drive(
            job,
            &config,
            trigger,
            &self.clock,
            &mut self.executor,
            &mut self.queue,
        )?;
        Ok(())
    }

    /// Offer every queued event to every job's condition trees.
    pub fn process_events(&mut self) -> Result<(), DaemonError> {
        bridge::process_pending_events(
            &mut self.registry,
            &mut self.queue,
            &self.clock,
            &mut self.executor,
        )?;
        Ok(())
    }

    /// Escalate to `SIGKILL` every job whose kill timer has fired.
    pub fn check_kill_timers(&mut self) -> Result<(), DaemonError> {
        for job_key in self.executor.expired_kill_timers(Instant::now()) {
            if let Some((config_name, instance)) = split_key(&job_key) {
                self.drive_job(&config_name, &instance, Trigger::KillTimerExpired)?;
            }
        }
        Ok(())
    }

    /// Reap every pid that is ready, non-blockingly, routing each through
    /// the state machine or the process tracer.
    pub fn reap_children(&mut self) -> Result<(), DaemonError> {
        loop {
            let status = match waitpid(
                Pid::from_raw(-1),
                Some(WaitPidFlag::WNOHANG | WaitPidFlag::__WALL),
            ) {
                Ok(WaitStatus::StillAlive) => break,
                Ok(status) => status,
                Err(nix::Error::ECHILD) => break,
                Err(e) => return Err(DaemonError::Wait(e)),
            };
            self.handle_wait_status(status)?;
        }
        Ok(())
    }

    fn handle_wait_status(&mut self, status: WaitStatus) -> Result<(), DaemonError> {
        if let Some((pid, outcome)) = classify_wait_status(status) {
            if let Some((config_name, instance, process)) = self.locate(pid) {
                self.drive_job(
                    &config_name,
                    &instance,
                    Trigger::ProcessExited {
                        process,
                        pid,
                        outcome,
                    },
                )?;
            }
            return Ok(());
        }

        match status {
            WaitStatus::PtraceEvent(pid, _signal, event)
                if event == libc::PTRACE_EVENT_FORK =>
            {
                let child_pid = ptrace::getevent(pid).unwrap_or(0) as i32;
                self.advance_trace(pid.as_raw(), tracer::TraceEvent::Forked { child_pid })?;
            }
            WaitStatus::Stopped(pid, Signal::SIGSTOP) => {
                self.advance_trace(pid.as_raw(), tracer::TraceEvent::Stopped)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn locate(&self, pid: i32) -> Option<(String, String, ProcessType)> {
        let (job, process) = self.registry.find_by_pid(pid)?;
        Some((job.config_name.clone(), job.instance.clone(), process))
    }

    fn advance_trace(&mut self, observed_pid: i32, event: tracer::TraceEvent) -> Result<(), DaemonError> {
        let Some((config_name, instance, process)) = self.locate(observed_pid) else {
            return Ok(());
        };
        let Some(config) = self.registry.config(&config_name).cloned() else {
            return Ok(());
        };
        let job = self
            .registry
            .get_mut(&config_name, &instance)
            .expect("located by pid on this registry");

        let current = job
            .processes
            .get(&process)
            .and_then(|slot| slot.trace)
            .unwrap_or(TraceState::New);
        let advance = tracer::advance(config.expect, current, &job.key(), observed_pid, event);

        if let Some(slot) = job.processes.get_mut(&process) {
            slot.trace = Some(advance.state);
            if let Some(new_pid) = advance.tracked_pid {
                slot.pid = Some(new_pid);
            }
        }

        self.executor.apply(advance.effects, &mut self.queue)?;

        if tracer::is_settled(config.expect, advance.state) {
            self.drive_job(&config_name, &instance, Trigger::TraceSettled)?;
        }
        Ok(())
    }
}

/// Split a job's wire key (`name` or `name/instance`) back into its parts.
fn split_key(key: &str) -> Option<(String, String)> {
    match key.split_once('/') {
        Some((name, instance)) => Some((name.to_string(), instance.to_string())),
        None => Some((key.to_string(), String::new())),
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
