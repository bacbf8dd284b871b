// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded health-event dispatch.
//!
//! Detection must never wait on the maintenance authority: transitions are
//! pushed into a bounded queue that drops its oldest entry on overflow
//! (counting the loss), and a dispatcher task drains the queue to the
//! configured sink. On shutdown the dispatcher drains whatever is left;
//! the caller bounds that drain with a grace period.

use crate::stats::ServerStats;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use vigil_core::{HealthEvent, HealthSink};

pub struct EventQueue {
    queue: Mutex<VecDeque<HealthEvent>>,
    capacity: usize,
    notify: Notify,
    stats: Arc<ServerStats>,
}

impl EventQueue {
    pub fn new(capacity: usize, stats: Arc<ServerStats>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            notify: Notify::new(),
            stats,
        })
    }

    /// Enqueue an event without ever blocking. On overflow the oldest
    /// pending event is discarded and counted.
    pub fn push(&self, event: HealthEvent) {
        {
            let mut queue = self.queue.lock();
            if queue.len() == self.capacity {
                queue.pop_front();
                ServerStats::bump(&self.stats.events_dropped);
                tracing::warn!("health event queue full, dropped oldest event");
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    fn drain(&self) -> Vec<HealthEvent> {
        self.queue.lock().drain(..).collect()
    }

    /// Dispatcher task: drain to the sink until cancelled, then flush the
    /// remainder best-effort.
    pub async fn run(self: Arc<Self>, sink: Arc<dyn HealthSink>, cancel: CancellationToken) {
        loop {
            for event in self.drain() {
                sink.emit(event);
                ServerStats::bump(&self.stats.events_delivered);
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.notify.notified() => {}
            }
        }
        // Final flush for events queued after the last drain.
        for event in self.drain() {
            sink.emit(event);
            ServerStats::bump(&self.stats.events_delivered);
        }
    }
}

/// Default sink: hands transitions to the log stream, where the maintenance
/// authority's collector picks them up.
pub struct LogSink;

impl HealthSink for LogSink {
    fn emit(&self, event: HealthEvent) {
        tracing::info!(
            instance = %event.instance,
            previous = %event.previous,
            current = %event.current,
            cause = ?event.cause,
            at_ms = event.at_ms,
            "health transition"
        );
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
