// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translating wire [`Message`]s into [`DaemonState`] actions and back into
//! the reply (or sequence of replies) the client is waiting on.

use tracing::{info, warn};

use upstart_core::environment::Environment;
use upstart_core::job::Job;
use upstart_wire::Message;

use crate::state::DaemonState;

/// Handle one client request, returning every [`Message`] that should be
/// sent back in reply (in order; `JobQuery`/`JobListStart` fan out to more
/// than one).
pub fn handle(state: &mut DaemonState, message: Message) -> Vec<Message> {
    match message {
        Message::JobStart { name, instance, env } => start_job(state, &name, &instance, env),
        Message::JobStop { name, instance } => stop_job(state, &name, &instance),
        Message::JobQuery { name, instance } => query_job(state, &name, &instance),
        Message::JobListStart => list_jobs(state),
        Message::EventEmit { name, args, env } => emit_event(state, &name, args, env),
        other => {
            warn!(?other, "unexpected message on the control socket");
            vec![Message::Error {
                message: "unexpected message type".to_string(),
            }]
        }
    }
}

fn start_job(state: &mut DaemonState, name: &str, instance: &str, env: Vec<String>) -> Vec<Message> {
    if !env.is_empty() {
        let job = state.registry.instance(name, instance);
        job.env.append(&Environment::from_entries(env), true);
    }
    match state.drive_job(name, instance, upstart_engine::Trigger::GoalStart) {
        Ok(()) => {
            info!(%name, %instance, "job start requested");
            vec![Message::Reply]
        }
        Err(e) => vec![Message::Error {
            message: e.to_string(),
        }],
    }
}

fn stop_job(state: &mut DaemonState, name: &str, instance: &str) -> Vec<Message> {
    match state.drive_job(name, instance, upstart_engine::Trigger::GoalStop) {
        Ok(()) => {
            info!(%name, %instance, "job stop requested");
            vec![Message::Reply]
        }
        Err(e) => vec![Message::Error {
            message: e.to_string(),
        }],
    }
}

fn query_job(state: &DaemonState, name: &str, instance: &str) -> Vec<Message> {
    if state.registry.config(name).is_none() {
        return vec![Message::Error {
            message: format!("no such job '{name}'"),
        }];
    }

    let mut replies = Vec::new();
    if instance.is_empty() {
        for job in state.registry.jobs_for_config(name) {
            replies.push(job_status(job));
        }
    } else if let Some(job) = state.registry.get(name, instance) {
        replies.push(job_status(job));
    }
    replies.push(Message::JobStatusEnd);
    replies
}

fn list_jobs(state: &DaemonState) -> Vec<Message> {
    let names: Vec<String> = state.registry.config_names().map(str::to_string).collect();
    let mut replies = Vec::new();
    for name in names {
        for job in state.registry.jobs_for_config(&name) {
            replies.push(job_status(job));
        }
    }
    replies.push(Message::JobListEnd);
    replies
}

fn emit_event(state: &mut DaemonState, name: &str, args: Vec<String>, env: Vec<String>) -> Vec<Message> {
    state.queue.push(name, args, Environment::from_entries(env));
    match state.process_events() {
        Ok(()) => vec![Message::Reply],
        Err(e) => vec![Message::Error {
            message: e.to_string(),
        }],
    }
}

fn job_status(job: &Job) -> Message {
    Message::JobStatus {
        name: job.config_name.clone(),
        instance: job.instance.clone(),
        goal: format!("{:?}", job.goal),
        state: format!("{:?}", job.state),
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
