// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime.

use thiserror::Error;
use upstart_core::environment::EnvError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("job config not found: {0}")]
    ConfigNotFound(String),
    #[error("environment expansion failed: {0}")]
    Environment(#[from] EnvError),
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("ptrace operation failed: {0}")]
    Trace(#[source] nix::Error),
    #[error("signal delivery failed: {0}")]
    Signal(#[source] nix::Error),
}
