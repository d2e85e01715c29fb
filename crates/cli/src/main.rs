// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! initctl - control client for upstartd

mod client;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "initctl", version, about = "Control the upstartd service supervisor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a job (or job instance)
    Start {
        /// Job name, or `name/instance` for an `instance $VAR` job
        job: String,
        /// Extra `KEY=VALUE` environment entries for this start
        #[arg(long = "env", short = 'e')]
        env: Vec<String>,
    },
    /// Stop a job (or job instance)
    Stop {
        job: String,
    },
    /// Show one job's goal and state
    Status {
        job: String,
    },
    /// List every loaded job and its instances
    List,
    /// Emit an event, as if a job had caused it
    Emit {
        /// Event name
        name: String,
        /// Positional event arguments
        args: Vec<String>,
        /// `KEY=VALUE` entries to attach to the event's environment
        #[arg(long = "env", short = 'e')]
        env: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Start { job, env } => commands::start(&job, env),
        Commands::Stop { job } => commands::stop(&job),
        Commands::Status { job } => commands::status(&job),
        Commands::List => commands::list(),
        Commands::Emit { name, args, env } => commands::emit(&name, args, env),
    }
}
