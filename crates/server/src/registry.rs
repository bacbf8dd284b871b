// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry: one tracking record per registered instance.
//!
//! The map itself sits behind a read/write lock that is only held for
//! lookups and membership changes; every session has its own mutex, so
//! heartbeat arrival and sweep evaluation for one instance serialize against
//! each other while distinct instances proceed in parallel.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use vigil_core::{
    Clock, HealthEvent, HealthState, InstanceId, ServerConfig, Session, TransitionCause,
};
use vigil_wire::{Heartbeat, SessionEntry};

/// Datagram or control request for an identity nobody registered.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown instance {0}")]
pub struct UnknownInstance(pub InstanceId);

/// Result of one sweep pass.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub events: Vec<HealthEvent>,
    pub evicted: Vec<InstanceId>,
}

pub struct SessionRegistry<C: Clock> {
    clock: C,
    config: Arc<Mutex<ServerConfig>>,
    sessions: RwLock<HashMap<InstanceId, Arc<Mutex<Session>>>>,
}

impl<C: Clock> SessionRegistry<C> {
    pub fn new(clock: C, config: Arc<Mutex<ServerConfig>>) -> Self {
        Self {
            clock,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Announce an instance. Idempotent; returns false when it was already
    /// registered (the existing session is left untouched).
    pub fn register(&self, id: InstanceId) -> bool {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return false;
        }
        let heartbeat = self.config.lock().heartbeat.clone();
        let session = Session::new(id.clone(), &heartbeat, self.clock.now());
        sessions.insert(id, Arc::new(Mutex::new(session)));
        true
    }

    /// Destroy an instance's session. A session that was still monitored
    /// produces a final transition to `disabled` so the maintenance
    /// authority observes the instance leaving.
    pub fn deregister(&self, id: &InstanceId) -> Result<Option<HealthEvent>, UnknownInstance> {
        let handle = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| UnknownInstance(id.clone()))?;
        let mut session = handle.lock();
        let event = session
            .disable(TransitionCause::Deregistered)
            .map(|t| HealthEvent::from_transition(id.clone(), t, self.clock.epoch_ms()));
        Ok(event)
    }

    /// Force an instance out of monitoring without destroying its session.
    pub fn disable(&self, id: &InstanceId) -> Result<Option<HealthEvent>, UnknownInstance> {
        let handle = self.get(id).ok_or_else(|| UnknownInstance(id.clone()))?;
        let mut session = handle.lock();
        Ok(session
            .disable(TransitionCause::Disabled)
            .map(|t| HealthEvent::from_transition(id.clone(), t, self.clock.epoch_ms())))
    }

    /// Re-admit a disabled instance; it re-arms at `unknown`.
    pub fn enable(&self, id: &InstanceId) -> Result<Option<HealthEvent>, UnknownInstance> {
        let handle = self.get(id).ok_or_else(|| UnknownInstance(id.clone()))?;
        let mut session = handle.lock();
        Ok(session
            .enable(self.clock.now())
            .map(|t| HealthEvent::from_transition(id.clone(), t, self.clock.epoch_ms())))
    }

    pub fn get(&self, id: &InstanceId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().get(id).cloned()
    }

    /// Feed one received heartbeat into its session.
    pub fn observe(&self, beat: &Heartbeat) -> Result<Option<HealthEvent>, UnknownInstance> {
        let handle = self
            .get(&beat.instance)
            .ok_or_else(|| UnknownInstance(beat.instance.clone()))?;
        let mut session = handle.lock();
        Ok(session
            .observe(beat.flags, beat.seq, self.clock.now())
            .map(|t| {
                HealthEvent::from_transition(beat.instance.clone(), t, self.clock.epoch_ms())
            }))
    }

    /// One full sweep pass: evaluate timeouts for every session and evict
    /// sessions silent past the hard eviction bound. Disabled sessions are
    /// exempt from eviction — they wait for an explicit enable or
    /// deregister.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let at_ms = self.clock.epoch_ms();
        let eviction = self.config.lock().eviction_bound();

        let handles: Vec<(InstanceId, Arc<Mutex<Session>>)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();

        let mut report = SweepReport::default();
        let mut expired = Vec::new();
        for (id, handle) in handles {
            let mut session = handle.lock();
            if session.state() != HealthState::Disabled && session.silence(now) >= eviction {
                expired.push(id);
                continue;
            }
            if let Some(transition) = session.evaluate(now) {
                report
                    .events
                    .push(HealthEvent::from_transition(id, transition, at_ms));
            }
        }

        if !expired.is_empty() {
            let mut sessions = self.sessions.write();
            for id in expired {
                // Re-check under the write lock; a heartbeat may have
                // landed between the scan and the removal.
                let still_expired = sessions
                    .get(&id)
                    .map(|handle| {
                        let session = handle.lock();
                        session.state() != HealthState::Disabled
                            && session.silence(now) >= eviction
                    })
                    .unwrap_or(false);
                if still_expired {
                    sessions.remove(&id);
                    report.evicted.push(id);
                }
            }
        }

        report
    }

    /// Push updated thresholds into every live session.
    pub fn reconfigure(&self) {
        let heartbeat = self.config.lock().heartbeat.clone();
        let sessions = self.sessions.read();
        for handle in sessions.values() {
            handle.lock().reconfigure(&heartbeat);
        }
    }

    /// Session table for status reporting, sorted by identity.
    pub fn snapshot(&self) -> Vec<SessionEntry> {
        let now = self.clock.now();
        let mut entries: Vec<SessionEntry> = self
            .sessions
            .read()
            .values()
            .map(|handle| {
                let session = handle.lock();
                SessionEntry {
                    instance: session.id().clone(),
                    state: session.state(),
                    missed: session.missed(),
                    last_seq: session.last_seq(),
                    restarts: session.restarts(),
                    silence_ms: session.silence(now).as_millis() as u64,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.instance.as_str().cmp(b.instance.as_str()));
        entries
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
