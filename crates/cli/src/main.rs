// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! vigil: operator CLI for the heartbeat daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vigil", version, about = "guest heartbeat monitoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session table and server counters
    Status,

    /// Liveness probe: receive/sweep loop progress
    Ping,

    /// Register an instance for monitoring
    Register { instance: String },

    /// Destroy an instance's session
    Deregister { instance: String },

    /// Re-admit a disabled instance
    Enable { instance: String },

    /// Force an instance out of monitoring
    Disable { instance: String },

    /// Daemon management
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },
}

#[derive(Subcommand)]
enum DaemonCommands {
    /// Stop the daemon gracefully
    Stop,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Status => commands::status::status().await,
        Commands::Ping => commands::status::ping().await,
        Commands::Register { instance } => commands::instance::register(&instance).await,
        Commands::Deregister { instance } => commands::instance::deregister(&instance).await,
        Commands::Enable { instance } => commands::instance::enable(&instance).await,
        Commands::Disable { instance } => commands::instance::disable(&instance).await,
        Commands::Daemon { command } => match command {
            DaemonCommands::Stop => commands::daemon::stop().await,
        },
    }
}
