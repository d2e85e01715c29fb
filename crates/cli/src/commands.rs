// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One function per subcommand: build the request, round-trip it through
//! the [`DaemonClient`], and print the reply.

use anyhow::{anyhow, Result};
use upstart_wire::Message;

use crate::client::DaemonClient;

/// Split `name` or `name/instance` as `initctl` accepts it on the command
/// line into the pair the wire protocol wants.
fn split_job(job: &str) -> (String, String) {
    match job.split_once('/') {
        Some((name, instance)) => (name.to_string(), instance.to_string()),
        None => (job.to_string(), String::new()),
    }
}

pub fn start(job: &str, env: Vec<String>) -> Result<()> {
    let (name, instance) = split_job(job);
    let client = DaemonClient::connect()?;
    client.request(Message::JobStart { name, instance, env })?;
    println!("{job} start/running");
    Ok(())
}

pub fn stop(job: &str) -> Result<()> {
    let (name, instance) = split_job(job);
    let client = DaemonClient::connect()?;
    client.request(Message::JobStop { name, instance })?;
    println!("{job} stop/waiting");
    Ok(())
}

pub fn status(job: &str) -> Result<()> {
    let (name, instance) = split_job(job);
    let client = DaemonClient::connect()?;
    let replies = client.request_stream(
        Message::JobQuery { name, instance },
        |m| matches!(m, Message::JobStatusEnd),
    )?;
    if replies.is_empty() {
        return Err(anyhow!("{job}: no such instance"));
    }
    for reply in replies {
        print_status(&reply)?;
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let client = DaemonClient::connect()?;
    let replies = client.request_stream(Message::JobListStart, |m| {
        matches!(m, Message::JobListEnd)
    })?;
    for reply in replies {
        print_status(&reply)?;
    }
    Ok(())
}

pub fn emit(name: &str, args: Vec<String>, env: Vec<String>) -> Result<()> {
    let client = DaemonClient::connect()?;
    client.request(Message::EventEmit {
        name: name.to_string(),
        args,
        env,
    })?;
    println!("{name} emitted");
    Ok(())
}

fn print_status(message: &Message) -> Result<()> {
    match message {
        Message::JobStatus {
            name,
            instance,
            goal,
            state,
        } => {
            let job = if instance.is_empty() {
                name.clone()
            } else {
                format!("{name}/{instance}")
            };
            println!("{job} {goal}/{state}");
            Ok(())
        }
        other => Err(anyhow!("unexpected reply: {other:?}")),
    }
}
