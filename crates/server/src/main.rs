// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! vigild: host-resident heartbeat aggregation daemon.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vigil_core::ServerConfig;
use vigil_server::control::ControlCtx;
use vigil_server::dispatch::LogSink;
use vigil_server::receiver::Receiver;
use vigil_server::sweep::Sweeper;
use vigil_server::{control, env, signals, startup, Paths};

#[derive(Parser)]
#[command(name = "vigild", version, about = "guest heartbeat aggregation daemon")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "/etc/vigil/vigil.conf")]
    config: PathBuf,

    /// Log to stderr instead of the state-directory log file
    #[arg(long)]
    stderr: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Configuration must parse and validate at first startup; after that,
    // failed reloads keep the active config.
    let config = ServerConfig::load(&args.config)?;
    let paths = Paths::resolve()?;

    // Rotation-safe logging: the appender reopens a fresh file daily, so an
    // external rotation policy only has to collect old files.
    let _guard = if args.stderr {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
        None
    } else {
        std::fs::create_dir_all(&paths.log_dir)?;
        let appender = tracing_appender::rolling::daily(&paths.log_dir, "vigild.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    };

    let result = startup(config, paths).await?;
    let daemon = result.daemon;
    let shutdown = daemon.shutdown.clone();

    let rx = Receiver::new(
        Arc::clone(&daemon.registry),
        Arc::clone(&daemon.queue),
        Arc::clone(&daemon.stats),
        Arc::clone(&daemon.probe),
        vigil_core::SystemClock,
    );
    let receiver_task = tokio::spawn(rx.run(result.udp, shutdown.clone()));

    let sweeper = Sweeper::new(
        Arc::clone(&daemon.registry),
        Arc::clone(&daemon.queue),
        Arc::clone(&daemon.probe),
        Arc::clone(&daemon.config),
        vigil_core::SystemClock,
    );
    let sweep_task = tokio::spawn(sweeper.run(shutdown.clone()));

    let dispatcher_task = tokio::spawn(Arc::clone(&daemon.queue).run(
        Arc::new(LogSink),
        shutdown.clone(),
    ));

    let ctx = Arc::new(ControlCtx {
        registry: Arc::clone(&daemon.registry),
        queue: Arc::clone(&daemon.queue),
        stats: Arc::clone(&daemon.stats),
        probe: Arc::clone(&daemon.probe),
        clock: vigil_core::SystemClock,
        start_time: daemon.start_time,
        shutdown: shutdown.clone(),
    });
    let control_task = tokio::spawn(control::run(result.control, ctx));

    signals::run(
        args.config.clone(),
        Arc::clone(&daemon.config),
        Arc::clone(&daemon.registry),
        shutdown.clone(),
    )
    .await;

    // Graceful stop: the receive loop and sweep end on cancellation; the
    // dispatcher flushes pending health events within a bounded grace
    // period.
    let deadline = Instant::now() + env::drain_timeout();
    for (name, task) in [
        ("receiver", receiver_task),
        ("sweep", sweep_task),
        ("control", control_task),
        ("dispatcher", dispatcher_task),
    ] {
        let left = deadline.saturating_duration_since(Instant::now());
        if tokio::time::timeout(left, task).await.is_err() {
            warn!("{} did not stop within the grace period", name);
        }
    }

    let mut daemon = daemon;
    daemon.shutdown();
    info!("exit");
    Ok(())
}
