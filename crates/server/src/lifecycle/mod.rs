// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: filesystem layout, startup, shutdown.

mod startup;
pub use startup::{startup, StartupResult};

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vigil_core::{ConfigError, ServerConfig, SystemClock};

use crate::dispatch::EventQueue;
use crate::probe::Progress;
use crate::registry::SessionRegistry;
use crate::stats::ServerStats;

/// Filesystem layout of a running daemon.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root state directory (e.g. ~/.local/state/vigil)
    pub state_dir: PathBuf,
    /// Path to the control Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Directory for daemon log files
    pub log_dir: PathBuf,
}

impl Paths {
    /// Resolve fixed paths under the state directory. One daemon serves
    /// all guests on the host.
    pub fn resolve() -> Result<Self, LifecycleError> {
        Ok(Self::under(crate::env::state_dir()?))
    }

    pub fn under(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("vigild.sock"),
            lock_path: state_dir.join("vigild.pid"),
            version_path: state_dir.join("vigild.version"),
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct Daemon {
    pub paths: Paths,
    // NOTE(lifetime): held to maintain the exclusive pid-file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub config: Arc<Mutex<ServerConfig>>,
    pub registry: Arc<SessionRegistry<SystemClock>>,
    pub queue: Arc<EventQueue>,
    pub stats: Arc<ServerStats>,
    pub probe: Arc<Progress>,
    /// Cancelled on SIGTERM/SIGINT or a Shutdown control request.
    pub shutdown: CancellationToken,
    pub start_time: Instant,
}

impl Daemon {
    /// Tear down the daemon's filesystem footprint. Called after the task
    /// set has been cancelled and the event queue drained best-effort.
    pub fn shutdown(&mut self) {
        info!("shutting down daemon");

        if self.paths.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.socket_path) {
                warn!("failed to remove control socket: {}", e);
            }
        }
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("failed to remove pid file: {}", e);
            }
        }
        if self.paths.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.version_path) {
                warn!("failed to remove version file: {}", e);
            }
        }
        // The pid-file lock is released when self.lock_file drops.

        info!("daemon shutdown complete");
    }
}

/// Lifecycle errors. Everything here is fatal at startup: without its lock,
/// configuration, and listening endpoint the daemon cannot function, and
/// the process monitor is expected to see the exit.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind heartbeat endpoint {0}: {1}")]
    BindUdp(String, #[source] std::io::Error),

    #[error("failed to bind control socket at {0}: {1}")]
    BindControl(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
