// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition files: one TOML file per job under the job directory,
//! parsed into an `upstart-core` [`JobConfig`] and loaded into the
//! registry at startup.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use upstart_core::{Environment, EventOperator, JobConfig, JobExpect, ProcessSpec, RespawnPolicy};

/// Errors loading job definitions.
#[derive(Debug, Error)]
pub enum JobConfError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid 'start on'/'stop on' condition in {path}: {message}")]
    Condition {
        path: std::path::PathBuf,
        message: String,
    },
}

/// The on-disk shape of a job file, before it is lowered into the core
/// [`JobConfig`] the engine operates on.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    description: Option<String>,
    #[serde(default)]
    start_on: Option<String>,
    #[serde(default)]
    stop_on: Option<String>,
    #[serde(default)]
    processes: HashMap<String, ProcessFile>,
    #[serde(default)]
    expect: ExpectFile,
    #[serde(default)]
    respawn: bool,
    #[serde(default = "default_respawn_limit")]
    respawn_limit: u32,
    #[serde(default = "default_respawn_interval_secs")]
    respawn_interval_secs: u64,
    #[serde(default)]
    normal_exit: Vec<i32>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default = "default_kill_timeout_secs")]
    kill_timeout_secs: u64,
    #[serde(default)]
    single_instance: bool,
}

#[derive(Debug, Deserialize)]
struct ProcessFile {
    command: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ExpectFile {
    #[default]
    None,
    Stop,
    Fork,
    Daemon,
}

fn default_respawn_limit() -> u32 {
    10
}

fn default_respawn_interval_secs() -> u64 {
    5
}

fn default_kill_timeout_secs() -> u64 {
    5
}

/// Process slot names a job file's `[processes.*]` table may use.
const PROCESS_NAMES: [(&str, upstart_core::job::ProcessType); 5] = [
    ("pre-start", upstart_core::job::ProcessType::PreStart),
    ("main", upstart_core::job::ProcessType::Main),
    ("post-start", upstart_core::job::ProcessType::PostStart),
    ("pre-stop", upstart_core::job::ProcessType::PreStop),
    ("post-stop", upstart_core::job::ProcessType::PostStop),
];

/// Load every `*.toml` file in `dir` into a [`JobConfig`], keyed by file
/// stem (the job name). Missing directories load as zero jobs rather than
/// erroring, since a fresh install may not have one yet.
pub fn load_dir(dir: &Path) -> Result<Vec<JobConfig>, JobConfError> {
    let mut configs = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(configs),
        Err(source) => {
            return Err(JobConfError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|source| JobConfError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("job")
            .to_string();
        configs.push(load_file(&path, name)?);
    }

    configs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(configs)
}

fn load_file(path: &Path, name: String) -> Result<JobConfig, JobConfError> {
    let text = std::fs::read_to_string(path).map_err(|source| JobConfError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: JobFile = toml::from_str(&text).map_err(|source| JobConfError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    let start_on = file
        .start_on
        .as_deref()
        .map(|s| parse_condition(s).map_err(|message| JobConfError::Condition {
            path: path.to_path_buf(),
            message,
        }))
        .transpose()?;
    let stop_on = file
        .stop_on
        .as_deref()
        .map(|s| parse_condition(s).map_err(|message| JobConfError::Condition {
            path: path.to_path_buf(),
            message,
        }))
        .transpose()?;

    let mut processes = HashMap::new();
    for (key, spec) in &file.processes {
        let Some((_, ty)) = PROCESS_NAMES.iter().find(|(n, _)| *n == key) else {
            continue;
        };
        let mut process = ProcessSpec::new(spec.command.clone());
        if let Some(secs) = spec.timeout_secs {
            process = process.with_timeout(Duration::from_secs(secs));
        }
        processes.insert(*ty, process);
    }

    let mut env = Environment::new();
    for (key, value) in &file.env {
        env.set(key, value);
    }

    Ok(JobConfig {
        name,
        description: file.description,
        start_on,
        stop_on,
        processes,
        expect: match file.expect {
            ExpectFile::None => JobExpect::None,
            ExpectFile::Stop => JobExpect::Stop,
            ExpectFile::Fork => JobExpect::Fork,
            ExpectFile::Daemon => JobExpect::Daemon,
        },
        respawn: RespawnPolicy {
            respawn: file.respawn,
            limit: file.respawn_limit,
            interval: Duration::from_secs(file.respawn_interval_secs),
        },
        normal_exit: file.normal_exit,
        env,
        kill_timeout: Duration::from_secs(file.kill_timeout_secs),
        single_instance: file.single_instance,
    })
}

/// Parse a `start on`/`stop on` condition string into an [`EventOperator`]
/// tree. Grammar: `NAME [ARG ...] [(and|or) NAME [ARG ...]] ...`, with
/// parentheses for grouping and `and` binding tighter than `or`.
fn parse_condition(text: &str) -> Result<EventOperator, String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut cursor = 0usize;
    let tree = parse_or(&tokens, &mut cursor)?;
    if cursor != tokens.len() {
        return Err(format!("unexpected trailing token '{}'", tokens[cursor]));
    }
    Ok(tree)
}

fn parse_or(tokens: &[&str], cursor: &mut usize) -> Result<EventOperator, String> {
    let mut lhs = parse_and(tokens, cursor)?;
    while tokens.get(*cursor) == Some(&"or") {
        *cursor += 1;
        let rhs = parse_and(tokens, cursor)?;
        lhs = EventOperator::or(lhs, rhs);
    }
    Ok(lhs)
}

fn parse_and(tokens: &[&str], cursor: &mut usize) -> Result<EventOperator, String> {
    let mut lhs = parse_primary(tokens, cursor)?;
    while tokens.get(*cursor) == Some(&"and") {
        *cursor += 1;
        let rhs = parse_primary(tokens, cursor)?;
        lhs = EventOperator::and(lhs, rhs);
    }
    Ok(lhs)
}

fn parse_primary(tokens: &[&str], cursor: &mut usize) -> Result<EventOperator, String> {
    match tokens.get(*cursor) {
        Some(&"(") => {
            *cursor += 1;
            let inner = parse_or(tokens, cursor)?;
            match tokens.get(*cursor) {
                Some(&")") => {
                    *cursor += 1;
                    Ok(inner)
                }
                _ => Err("expected ')'".to_string()),
            }
        }
        Some(&name) => {
            *cursor += 1;
            let mut args = Vec::new();
            while let Some(&tok) = tokens.get(*cursor) {
                if tok == "and" || tok == "or" || tok == ")" {
                    break;
                }
                args.push(tok.to_string());
                *cursor += 1;
            }
            Ok(EventOperator::match_on(name, args))
        }
        None => Err("expected an event name".to_string()),
    }
}

#[cfg(test)]
#[path = "jobconf_tests.rs"]
mod tests;
