// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! All timeout math in the health state machine uses monotonic `Instant`s
//! obtained through this trait; wall-clock milliseconds appear only in
//! diagnostics and health events. Heartbeat send timestamps are never used
//! for timeout decisions, so guest clock skew cannot skew detection.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for tests with controllable time.
///
/// Clones share the underlying time, so a clock handed to a session registry
/// can be advanced from the test body.
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<(Instant, u64)>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new((Instant::now(), 1_000_000))),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.0 += duration;
        state.1 += duration.as_millis() as u64;
    }

    /// Advance the clock by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().0
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().1
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
