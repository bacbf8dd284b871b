// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use parking_lot::Mutex;
use tokio::net::{UdpSocket, UnixListener};
use tokio_util::sync::CancellationToken;
use tracing::info;
use vigil_core::{Clock, ServerConfig, SystemClock};

use crate::dispatch::EventQueue;
use crate::probe::Progress;
use crate::registry::SessionRegistry;
use crate::stats::ServerStats;

use super::{Daemon, LifecycleError, Paths};

/// Result of daemon startup. The sockets are returned separately so the
/// caller can spawn the receive loop and the control listener as tasks.
pub struct StartupResult {
    pub daemon: Daemon,
    pub udp: UdpSocket,
    pub control: UnixListener,
}

/// Start the daemon: lock first, bind last.
pub async fn startup(config: ServerConfig, paths: Paths) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, &paths).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&paths);
            }
            Err(e)
        }
    }
}

async fn startup_inner(
    config: ServerConfig,
    paths: &Paths,
) -> Result<StartupResult, LifecycleError> {
    // 1. Create the state directory (needed for socket, lock, logs).
    std::fs::create_dir_all(&paths.state_dir)?;
    std::fs::create_dir_all(&paths.log_dir)?;

    // 2. Acquire the lock file FIRST — prevents races with a second daemon.
    // Open without truncating so a losing contender can't wipe the running
    // daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    // Write PID now that we hold the lock.
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Bind the heartbeat endpoint. Fatal on failure: without it the
    // daemon cannot do its one job.
    let endpoint = format!("{}:{}", config.bind_address, config.port);
    let udp = UdpSocket::bind(&endpoint)
        .await
        .map_err(|e| LifecycleError::BindUdp(endpoint.clone(), e))?;
    let local = udp.local_addr()?;

    // 4. Remove a stale control socket and bind.
    if paths.socket_path.exists() {
        std::fs::remove_file(&paths.socket_path)?;
    }
    let control = UnixListener::bind(&paths.socket_path)
        .map_err(|e| LifecycleError::BindControl(paths.socket_path.clone(), e))?;

    // 5. Write version file.
    std::fs::write(&paths.version_path, env!("CARGO_PKG_VERSION"))?;

    // 6. Assemble shared state.
    let clock = SystemClock;
    let config = Arc::new(Mutex::new(config));
    let stats = Arc::new(ServerStats::default());
    let queue = EventQueue::new(config.lock().event_queue, Arc::clone(&stats));
    let registry = Arc::new(SessionRegistry::new(clock.clone(), Arc::clone(&config)));
    let probe = Arc::new(Progress::new(clock.epoch_ms()));

    info!(endpoint = %local, socket = %paths.socket_path.display(), "daemon started");

    Ok(StartupResult {
        daemon: Daemon {
            paths: paths.clone(),
            lock_file,
            config,
            registry,
            queue,
            stats,
            probe,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        },
        udp,
        control,
    })
}

/// Clean up resources on startup failure.
fn cleanup_on_failure(paths: &Paths) {
    if paths.socket_path.exists() {
        let _ = std::fs::remove_file(&paths.socket_path);
    }
    if paths.version_path.exists() {
        let _ = std::fs::remove_file(&paths.version_path);
    }
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}
