// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal handling: SIGTERM/SIGINT stop the daemon, SIGHUP reloads the
//! configuration file. A reload that fails validation is logged and the
//! previously active configuration stays in effect.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vigil_core::{Clock, ServerConfig};

use crate::registry::SessionRegistry;

/// Run until a termination signal cancels the daemon token.
pub async fn run<C: Clock>(
    config_path: PathBuf,
    config: Arc<Mutex<ServerConfig>>,
    registry: Arc<SessionRegistry<C>>,
    shutdown: CancellationToken,
) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGINT handler: {}", e);
            return;
        }
    };
    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sigterm.recv() => {
                info!("SIGTERM received, stopping");
                shutdown.cancel();
                break;
            }
            _ = sigint.recv() => {
                info!("SIGINT received, stopping");
                shutdown.cancel();
                break;
            }
            _ = sighup.recv() => reload(&config_path, &config, &registry),
        }
    }
}

/// Re-read the configuration file. Endpoint settings need a restart; the
/// timing knobs apply to subsequent sweeps and evaluations.
fn reload<C: Clock>(
    path: &PathBuf,
    config: &Arc<Mutex<ServerConfig>>,
    registry: &Arc<SessionRegistry<C>>,
) {
    match ServerConfig::load(path) {
        Ok(fresh) => {
            let mut active = config.lock();
            if fresh.bind_address != active.bind_address || fresh.port != active.port {
                warn!("endpoint change in reloaded config ignored; restart to apply");
            }
            active.heartbeat = fresh.heartbeat;
            active.sweep_divisor = fresh.sweep_divisor;
            active.eviction_multiplier = fresh.eviction_multiplier;
            drop(active);
            registry.reconfigure();
            info!("configuration reloaded");
        }
        Err(e) => {
            warn!("config reload failed, keeping active configuration: {}", e);
        }
    }
}
