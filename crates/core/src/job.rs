// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job data model: configuration, runtime state, and the ten states a
//! job instance moves through between `waiting` and back again.
//!
//! This module holds only vocabulary — the transition table that decides
//! *which* state comes next lives in `upstart-engine`. A [`Job`] here just
//! knows what state it is in, what is currently running for it, and what
//! its goal is.

use crate::environment::Environment;
use crate::event_operator::EventOperator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// One of the process slots a job config may define a command for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    PreStart,
    Main,
    PostStart,
    PreStop,
    PostStop,
}

/// A command line and an optional timeout, as written in a job's
/// `pre-start script` / `exec` / etc. stanza.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub command: String,
    pub timeout: Option<Duration>,
}

impl ProcessSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What a job is trying to do, independent of what state it is actually in.
/// A running main process whose goal flips to `Stop` begins unwinding
/// through `pre-stop` even though its current state is still `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobGoal {
    Stop,
    Start,
}

/// The ten states a job instance can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Waiting,
    Starting,
    PreStart,
    Spawned,
    PostStart,
    Running,
    PreStop,
    Stopping,
    Killed,
    PostStop,
}

impl JobState {
    /// True for states where `running`/`stopped` events have semantic
    /// meaning for respawn and process tracking.
    pub fn is_running(self) -> bool {
        matches!(self, JobState::Running)
    }

    /// True once the instance has unwound back to the state it started in.
    pub fn is_waiting(self) -> bool {
        matches!(self, JobState::Waiting)
    }
}

/// How a daemonising job's final process is expected to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobExpect {
    /// `exec` runs in the foreground; the forked child *is* the job.
    None,
    /// `expect stop`: job sends itself `SIGSTOP` once ready.
    Stop,
    /// `expect daemon`: job double-forks; track through two forks.
    Daemon,
    /// `expect fork`: job forks once; track through one fork.
    Fork,
}

/// Where process tracing is with respect to a job expecting to fork or stop
/// itself. Lives here as vocabulary; `upstart-engine` drives it forward by
/// interpreting `ptrace` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceState {
    /// No process tracing is in effect for this process slot.
    NotTracing,
    /// Tracing armed, waiting for the traced process's first fork/stop.
    New,
    /// Seen the fork we expected; waiting on the child to behave.
    NewChild,
    /// Tracing has finished; the job is considered to have settled.
    Normal,
}

/// Respawn-on-crash policy and the runaway-detection window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespawnPolicy {
    pub respawn: bool,
    /// Max respawns allowed within `interval` before the job is considered
    /// runaway and its goal is forced to `Stop`.
    pub limit: u32,
    pub interval: Duration,
}

impl Default for RespawnPolicy {
    fn default() -> Self {
        Self {
            respawn: false,
            limit: 10,
            interval: Duration::from_secs(5),
        }
    }
}

/// Runtime state for one process slot: is anything running, and (for
/// daemonising jobs) where process tracing has gotten to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessSlot {
    pub pid: Option<i32>,
    pub trace: Option<TraceState>,
}

impl ProcessSlot {
    pub fn is_running(&self) -> bool {
        self.pid.is_some()
    }
}

/// The static, parsed definition of a job: everything that comes from the
/// job file and does not change while the daemon runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_on: Option<EventOperator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_on: Option<EventOperator>,
    pub processes: HashMap<ProcessType, ProcessSpec>,
    pub expect: JobExpect,
    pub respawn: RespawnPolicy,
    /// Exit statuses that do not count as a crash for respawn purposes.
    pub normal_exit: Vec<i32>,
    pub env: Environment,
    pub kill_timeout: Duration,
    /// Whether `stop on` conditions are re-evaluated while the job is
    /// already stopping (job files may declare `instance $VAR`, making
    /// each distinct value of `$VAR` its own job instance).
    pub single_instance: bool,
}

impl JobConfig {
    pub fn main_command(&self) -> Option<&str> {
        self.processes
            .get(&ProcessType::Main)
            .map(|p| p.command.as_str())
    }
}

/// One running (or waiting) instance of a [`JobConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub config_name: String,
    /// Empty for single-instance jobs; otherwise the resolved `$VAR` value.
    pub instance: String,
    pub goal: JobGoal,
    pub state: JobState,
    pub processes: HashMap<ProcessType, ProcessSlot>,
    pub respawn_count: u32,
    pub respawn_window_start_ms: Option<u64>,
    /// Environment assembled for this instance: job config env plus
    /// whatever the triggering `start on` condition collected.
    pub env: Environment,
    pub failed: bool,
    /// This instance's own copy of the config's `start on`/`stop on` trees.
    /// Cloned at creation time rather than shared, since each instance of
    /// an `instance $VAR` job tracks its own matched events independently.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_condition: Option<EventOperator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_condition: Option<EventOperator>,
}

impl Job {
    pub fn new(config_name: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            config_name: config_name.into(),
            instance: instance.into(),
            goal: JobGoal::Stop,
            state: JobState::Waiting,
            processes: HashMap::new(),
            respawn_count: 0,
            respawn_window_start_ms: None,
            env: Environment::new(),
            failed: false,
            start_condition: None,
            stop_condition: None,
        }
    }

    /// Build a job instance with its start/stop condition trees cloned
    /// from `config`, ready to track matches independently of any sibling
    /// instance of the same config.
    pub fn from_config(config: &JobConfig, instance: impl Into<String>) -> Self {
        Self {
            start_condition: config.start_on.clone(),
            stop_condition: config.stop_on.clone(),
            ..Self::new(config.name.clone(), instance)
        }
    }

    /// The composite key jobs are addressed by on the wire: `name` for
    /// single-instance jobs, `name/instance` otherwise.
    pub fn key(&self) -> String {
        if self.instance.is_empty() {
            self.config_name.clone()
        } else {
            format!("{}/{}", self.config_name, self.instance)
        }
    }

    pub fn pid_of(&self, process: ProcessType) -> Option<i32> {
        self.processes.get(&process).and_then(|slot| slot.pid)
    }

    pub fn find_by_pid(&self, pid: i32) -> Option<ProcessType> {
        self.processes
            .iter()
            .find(|(_, slot)| slot.pid == Some(pid))
            .map(|(ty, _)| *ty)
    }

    pub fn set_pid(&mut self, process: ProcessType, pid: Option<i32>) {
        self.processes.entry(process).or_default().pid = pid;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
