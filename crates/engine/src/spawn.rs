// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turning a job's configured process into a spawn [`Effect`].
//!
//! Building the child's argv/environment is pure — no `fork`/`exec` happens
//! here. The main loop in `upstart-daemon` consumes the resulting
//! [`Effect::Spawn`] and does the actual `posix_spawn`-style work,
//! including the `/dev/fd/<n>` trick for oversized `script ... end script`
//! blocks (see [`NEEDS_FD_SCRIPT_ABOVE`]).

use crate::effect::Effect;
use upstart_core::environment::Environment;
use upstart_core::job::{Job, JobConfig, ProcessSpec, ProcessType};

/// Scripts longer than this are written to a pipe and run as
/// `/bin/sh /dev/fd/<n>` instead of `/bin/sh -c <script>`, since very long
/// `-c` arguments can exceed `ARG_MAX` or get mangled by `ps` output.
pub const NEEDS_FD_SCRIPT_ABOVE: usize = 1024;

/// Shell metacharacters that mean a command line needs `/bin/sh -c` rather
/// than a direct `execve` of the first word.
const SHELL_METACHARS: [char; 13] = [
    '$', '`', '|', '&', ';', '<', '>', '(', ')', '{', '}', '*', '?',
];

pub fn needs_shell(command: &str) -> bool {
    command.contains(SHELL_METACHARS) || command.contains('\n')
}

/// Standard variables every spawned process sees, mirroring what the
/// running job knows about itself.
fn standard_env(job: &Job, triggering_events: &[&str]) -> Environment {
    let mut env = Environment::new();
    env.set("UPSTART_JOB", &job.config_name);
    if !job.instance.is_empty() {
        env.set("UPSTART_INSTANCE", &job.instance);
    }
    if !triggering_events.is_empty() {
        env.set("UPSTART_EVENTS", &triggering_events.join(","));
    }
    env
}

/// Assemble the environment a spawned process slot should see: the job
/// config's declared env, the instance env collected from whatever event
/// triggered it, and the `UPSTART_*` bookkeeping variables, each expanded
/// against the accumulated table so later entries can reference earlier
/// ones.
pub fn build_env(
    job: &Job,
    config: &JobConfig,
    triggering_events: &[&str],
) -> Result<Environment, upstart_core::environment::EnvError> {
    let mut env = standard_env(job, triggering_events);
    env.append(&config.env, true);
    env.append(&job.env, true);

    let mut expanded = Environment::new();
    for entry in env.iter() {
        let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
        let resolved = expanded.expand(value)?;
        expanded.set(key, &resolved);
    }
    Ok(expanded)
}

pub fn spawn_effect(
    job: &Job,
    process: ProcessType,
    spec: &ProcessSpec,
    env: Environment,
) -> Effect {
    Effect::Spawn {
        job_key: job.key(),
        process,
        command: spec.command.clone(),
        env,
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
