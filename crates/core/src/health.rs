// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance health state machine.
//!
//! A [`Session`] converts a stream of received heartbeats ([`Session::observe`])
//! and message-independent sweep evaluations ([`Session::evaluate`]) into
//! edge-triggered [`Transition`]s. Both paths take the current `Instant` from
//! the caller's clock, so the machine is fully deterministic under test.

use crate::config::HeartbeatConfig;
use crate::flags::EventFlags;
use crate::id::InstanceId;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Health of one guest instance as seen by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Registered, no heartbeat observed yet.
    Unknown,
    Healthy,
    /// Missed `miss_threshold` consecutive intervals.
    Degraded,
    /// Missed `failure_threshold` consecutive intervals. Not terminal: a
    /// paused-and-resumed guest re-admits on its next heartbeat.
    Failed,
    /// Externally forced out of monitoring; exited only by explicit
    /// re-enable, never by heartbeat arrival.
    Disabled,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Failed => "failed",
            HealthState::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// A valid heartbeat arrived.
    Heartbeat,
    /// The sweep found too many missed intervals.
    Timeout,
    /// The agent announced a deliberate shutdown (STOPPING flag).
    GracefulStop,
    /// External disable request.
    Disabled,
    /// External re-enable request.
    Enabled,
    /// The instance was deregistered while still monitored.
    Deregistered,
}

/// An edge-triggered state change. Exactly one health event is emitted per
/// transition; evaluations that leave the state unchanged produce none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthState,
    pub to: HealthState,
    pub cause: TransitionCause,
}

/// Server-side tracking record for one instance.
#[derive(Debug, Clone)]
pub struct Session {
    id: InstanceId,
    state: HealthState,
    poll_interval: Duration,
    miss_threshold: u32,
    failure_threshold: u32,
    last_seen: Instant,
    last_seq: Option<u32>,
    missed: u32,
    restarts: u32,
}

impl Session {
    /// Create a session in `Unknown`, armed with the current thresholds.
    pub fn new(id: InstanceId, config: &HeartbeatConfig, now: Instant) -> Self {
        Self {
            id,
            state: HealthState::Unknown,
            poll_interval: config.poll_interval,
            miss_threshold: config.miss_threshold,
            failure_threshold: config.failure_threshold,
            last_seen: now,
            last_seq: None,
            missed: 0,
            restarts: 0,
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// How often the agent behind this session has restarted (sequence
    /// regressions observed).
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn last_seq(&self) -> Option<u32> {
        self.last_seq
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Time since the last heartbeat (or since registration).
    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// Apply updated thresholds; takes effect on subsequent evaluations.
    pub fn reconfigure(&mut self, config: &HeartbeatConfig) {
        self.poll_interval = config.poll_interval;
        self.miss_threshold = config.miss_threshold;
        self.failure_threshold = config.failure_threshold;
    }

    /// A valid heartbeat for this instance arrived.
    ///
    /// Recovery is immediate: any beat resets the miss counter and re-admits
    /// a Degraded or Failed session to Healthy. A STOPPING flag forces
    /// Disabled, bypassing the timers, so a deliberate shutdown never reads
    /// as a failure. While Disabled the beat is absorbed: last-seen and
    /// sequence refresh, but no transition is produced.
    pub fn observe(
        &mut self,
        flags: EventFlags,
        seq: u32,
        now: Instant,
    ) -> Option<Transition> {
        if let Some(last) = self.last_seq {
            if seq_regressed(last, seq) {
                self.restarts += 1;
                tracing::debug!(
                    instance = %self.id,
                    last_seq = last,
                    seq,
                    "sequence regression, agent restarted"
                );
            }
        }
        self.last_seq = Some(seq);
        self.last_seen = now;
        self.missed = 0;

        if self.state == HealthState::Disabled {
            return None;
        }
        if flags.contains(EventFlags::STOPPING) {
            return self.shift(HealthState::Disabled, TransitionCause::GracefulStop);
        }
        self.shift(HealthState::Healthy, TransitionCause::Heartbeat)
    }

    /// Sweep step: drive timeout transitions from elapsed time alone.
    ///
    /// A guest that stops sending entirely is detected here without any
    /// further message arriving. At most one transition per call, so a
    /// session that blows straight past both thresholds still reports
    /// Degraded before Failed.
    pub fn evaluate(&mut self, now: Instant) -> Option<Transition> {
        match self.state {
            HealthState::Healthy | HealthState::Degraded => {}
            _ => return None,
        }

        self.missed = self.elapsed_intervals(now);
        match self.state {
            HealthState::Healthy if self.missed >= self.miss_threshold => {
                self.shift(HealthState::Degraded, TransitionCause::Timeout)
            }
            HealthState::Degraded if self.missed >= self.failure_threshold => {
                self.shift(HealthState::Failed, TransitionCause::Timeout)
            }
            _ => None,
        }
    }

    /// Externally force this session out of monitoring.
    pub fn disable(&mut self, cause: TransitionCause) -> Option<Transition> {
        self.missed = 0;
        self.shift(HealthState::Disabled, cause)
    }

    /// Exit Disabled; the session re-arms at Unknown and the next heartbeat
    /// re-admits it to Healthy.
    pub fn enable(&mut self, now: Instant) -> Option<Transition> {
        if self.state != HealthState::Disabled {
            return None;
        }
        self.last_seen = now;
        self.missed = 0;
        self.shift(HealthState::Unknown, TransitionCause::Enabled)
    }

    fn elapsed_intervals(&self, now: Instant) -> u32 {
        let elapsed = self.silence(now).as_millis();
        let interval = self.poll_interval.as_millis().max(1);
        u32::try_from(elapsed / interval).unwrap_or(u32::MAX)
    }

    fn shift(&mut self, to: HealthState, cause: TransitionCause) -> Option<Transition> {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        Some(Transition { from, to, cause })
    }
}

/// True when `next` stepping backwards from `last` means an agent restart.
/// A backward step of more than half the sequence space is a wrap, which is
/// normal progression.
fn seq_regressed(last: u32, next: u32) -> bool {
    next < last && last - next < u32::MAX / 2
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
