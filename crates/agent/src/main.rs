// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! vigil-agent: guest-resident heartbeat emitter.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vigil_agent::{AgentRuntime, UdpBeacon};
use vigil_core::{AgentConfig, InstanceId, SystemClock};

#[derive(Parser)]
#[command(name = "vigil-agent", version, about = "guest heartbeat emitter")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "/etc/vigil/vigil.conf")]
    config: PathBuf,

    /// Instance identity; overrides the configuration file
    #[arg(long)]
    instance: Option<String>,

    /// Directory for the agent log file
    #[arg(long, default_value = "/var/log/vigil")]
    log_dir: PathBuf,

    /// Log to stderr instead of the log directory
    #[arg(long)]
    stderr: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = if args.stderr {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
        None
    } else {
        std::fs::create_dir_all(&args.log_dir)
            .with_context(|| format!("creating log dir {}", args.log_dir.display()))?;
        let appender = tracing_appender::rolling::daily(&args.log_dir, "vigil-agent.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    };

    // No valid configuration at startup is fatal; the process monitor
    // restarts us once one exists.
    let config = AgentConfig::load(&args.config)?;
    let instance = args
        .instance
        .map(InstanceId::from_string)
        .or_else(|| config.instance.clone())
        .context("no instance identity: set --instance or [agent] instance")?;

    let beacon = UdpBeacon::connect(&config.endpoint())
        .await
        .with_context(|| format!("connecting heartbeat transport to {}", config.endpoint()))?;
    let mut agent = AgentRuntime::new(
        instance.clone(),
        config.poll_interval,
        beacon,
        SystemClock,
    );
    let mut endpoint = config.endpoint();

    info!(%instance, endpoint = %endpoint, "agent started");

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // The first tick fires immediately, carrying the STARTING flag.
    let mut ticker = tokio::time::interval(agent.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => agent.beat().await,

            _ = sighup.recv() => match AgentConfig::load(&args.config) {
                Ok(fresh) => {
                    if fresh.endpoint() != endpoint {
                        match UdpBeacon::connect(&fresh.endpoint()).await {
                            Ok(beacon) => {
                                agent.replace_beacon(beacon);
                                endpoint = fresh.endpoint();
                            }
                            Err(e) => {
                                warn!("reconnect to {} failed, keeping old endpoint: {}", fresh.endpoint(), e);
                            }
                        }
                    }
                    agent.set_poll_interval(fresh.poll_interval);
                    ticker = tokio::time::interval(fresh.poll_interval);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    info!(endpoint = %endpoint, "configuration reloaded");
                }
                Err(e) => warn!("config reload failed, keeping active configuration: {}", e),
            },

            _ = sigterm.recv() => break,
            _ = sigint.recv() => break,
        }
    }

    // Graceful stop: one final beat with the STOPPING flag suppresses a
    // false failure report on the server.
    agent.stop().await;
    info!("agent stopped");
    Ok(())
}
