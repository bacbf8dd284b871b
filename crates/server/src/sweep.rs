// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic sweep task.
//!
//! Runs independently of message arrival so total guest silence is still
//! detected. The cadence is derived from the active configuration
//! (`poll_interval / sweep_divisor`) and re-read every tick, which lets a
//! SIGHUP reload retune the sweep without restarting the daemon.

use crate::dispatch::EventQueue;
use crate::probe::Progress;
use crate::registry::SessionRegistry;
use crate::env;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vigil_core::{Clock, ServerConfig};

pub struct Sweeper<C: Clock> {
    registry: Arc<SessionRegistry<C>>,
    queue: Arc<EventQueue>,
    probe: Arc<Progress>,
    config: Arc<Mutex<ServerConfig>>,
    clock: C,
}

impl<C: Clock> Sweeper<C> {
    pub fn new(
        registry: Arc<SessionRegistry<C>>,
        queue: Arc<EventQueue>,
        probe: Arc<Progress>,
        config: Arc<Mutex<ServerConfig>>,
        clock: C,
    ) -> Self {
        Self { registry, queue, probe, config, clock }
    }

    /// Run until cancelled; an in-flight pass always completes.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let period = env::sweep_period_override()
                .unwrap_or_else(|| self.config.lock().sweep_period());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            self.pass();
        }
        tracing::info!("sweep stopped");
    }

    /// One full pass over the registry.
    pub fn pass(&self) {
        let report = self.registry.sweep();
        for event in report.events {
            self.queue.push(event);
        }
        for id in &report.evicted {
            tracing::info!(instance = %id, "evicted session after prolonged silence");
        }
        self.probe.mark_sweep(self.clock.epoch_ms());
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
