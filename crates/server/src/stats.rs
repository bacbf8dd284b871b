// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic server counters.

use std::sync::atomic::{AtomicU64, Ordering};
use vigil_wire::ServerCounters;

/// Lock-free counters shared by the receive loop, the sweep, and the event
/// dispatcher. Snapshot consistency across fields is not required.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub received: AtomicU64,
    pub corrupt: AtomicU64,
    pub unknown: AtomicU64,
    pub events_delivered: AtomicU64,
    pub events_dropped: AtomicU64,
}

impl ServerStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerCounters {
        ServerCounters {
            received: self.received.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}
